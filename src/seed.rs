use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::model::{Habit, HabitHistory, Priority, Roadmap, RoadmapStep, Task, TaskStatus};

/// Suggested categories. Records may carry any other text.
pub const CATEGORIES: &[&str] = &["Work", "Personal", "Learning", "Health", "Finance"];

/// Datasets written by `LocalStore::initialize` into empty collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedData {
    pub tasks: Vec<Task>,
    pub habits: Vec<Habit>,
    pub roadmaps: Vec<Roadmap>,
}

impl SeedData {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starter content shown on first launch.
    pub fn demo(today: NaiveDate, now: DateTime<Utc>) -> Self {
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);

        let tasks = vec![
            Task {
                id: "1".into(),
                title: "Complete Project Proposal".into(),
                description: Some("Draft the initial proposal for the Q4 marketing strategy.".into()),
                priority: Priority::High,
                status: TaskStatus::InProgress,
                due_date: today,
                category: "Work".into(),
                roadmap_id: None,
            },
            Task {
                id: "2".into(),
                title: "Read 20 pages of Clean Code".into(),
                description: None,
                priority: Priority::Medium,
                status: TaskStatus::ToDo,
                due_date: tomorrow,
                category: "Learning".into(),
                roadmap_id: None,
            },
        ];

        let habits = vec![
            Habit {
                id: "1".into(),
                title: "Morning Meditation".into(),
                streak: 5,
                history: HabitHistory::from_iter([today]),
                category: "Health".into(),
            },
            Habit {
                id: "2".into(),
                title: "Code for 1 hour".into(),
                streak: 12,
                history: HabitHistory::default(),
                category: "Learning".into(),
            },
        ];

        let step = |id: &str, title: &str, description: &str, completed: bool| RoadmapStep {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            deadline: None,
            completed,
            resources: None,
        };
        let roadmaps = vec![Roadmap {
            id: "1".into(),
            title: "Learn TypeScript".into(),
            description: "From zero to hero in TypeScript.".into(),
            steps: vec![
                step("s1", "Basic Types", "Understand string, number, boolean.", true),
                step("s2", "Interfaces vs Types", "Learn the differences.", false),
                step("s3", "Generics", "Master reusable code.", false),
            ],
            created_at: now,
            is_ai_generated: false,
        }];

        Self {
            tasks,
            habits,
            roadmaps,
        }
    }
}
