//! Read-side views computed from the collections: dashboard numbers, roadmap
//! progress, the task filter and the habit week grid.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::model::{Habit, Roadmap, Task};

/// Tasks listed under "upcoming" on the dashboard.
pub const UPCOMING_LIMIT: usize = 3;
/// Days shown in the habit grid, ending today.
pub const WEEK_WINDOW_DAYS: u64 = 7;
/// Category filter value meaning "no category filter".
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStreak {
    pub title: String,
    pub streak: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapProgress {
    pub id: String,
    pub title: String,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub completion_rate: u32,
    pub top_streak: u32,
    pub habit_streaks: Vec<HabitStreak>,
    pub roadmaps: Vec<RoadmapProgress>,
    pub upcoming: Vec<Task>,
}

/// Rounded whole percentage; zero when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Fraction of completed steps in `[0, 1]`; an empty roadmap has no progress.
pub fn roadmap_fraction(roadmap: &Roadmap) -> f64 {
    if roadmap.steps.is_empty() {
        return 0.0;
    }
    roadmap.completed_steps() as f64 / roadmap.steps.len() as f64
}

pub fn roadmap_progress(roadmap: &Roadmap) -> RoadmapProgress {
    let completed_steps = roadmap.completed_steps();
    RoadmapProgress {
        id: roadmap.id.clone(),
        title: roadmap.title.clone(),
        completed_steps,
        total_steps: roadmap.steps.len(),
        percent: percent(completed_steps, roadmap.steps.len()),
    }
}

pub fn dashboard(tasks: &[Task], habits: &[Habit], roadmaps: &[Roadmap]) -> DashboardSummary {
    let completed_tasks = tasks.iter().filter(|task| task.is_done()).count();
    DashboardSummary {
        total_tasks: tasks.len(),
        completed_tasks,
        pending_tasks: tasks.len() - completed_tasks,
        completion_rate: percent(completed_tasks, tasks.len()),
        top_streak: habits.iter().map(|habit| habit.streak).max().unwrap_or(0),
        habit_streaks: habits
            .iter()
            .map(|habit| HabitStreak {
                title: habit.title.clone(),
                streak: habit.streak,
            })
            .collect(),
        roadmaps: roadmaps.iter().map(roadmap_progress).collect(),
        upcoming: tasks
            .iter()
            .filter(|task| !task.is_done())
            .take(UPCOMING_LIMIT)
            .cloned()
            .collect(),
    }
}

/// Case-insensitive title search combined with an exact category match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub search: String,
    pub category: Option<String>,
}

impl TaskFilter {
    pub fn new(search: impl Into<String>, category: Option<String>) -> Self {
        let category = category.filter(|c| c != ALL_CATEGORIES);
        Self {
            search: search.into(),
            category,
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        let matches_search = task
            .title
            .to_lowercase()
            .contains(&self.search.to_lowercase());
        let matches_category = self
            .category
            .as_deref()
            .map_or(true, |category| task.category == category);
        matches_search && matches_category
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|task| self.matches(task)).collect()
    }
}

/// The last [`WEEK_WINDOW_DAYS`] days, oldest first, ending with `today`.
pub fn week_window(today: NaiveDate) -> Vec<NaiveDate> {
    (0..WEEK_WINDOW_DAYS)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .collect()
}
