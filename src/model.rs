//! Entity types persisted by the store and their boundary validation.
//!
//! Field names serialize in camelCase so stored documents keep the shape the
//! web front end reads (`dueDate`, `roadmapId`, `isAiGenerated`, ...).

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::{id::new_uuid_v7, time, AppError, AppResult};

const VALIDATION_ID_CODE: &str = "VALIDATION/ID";
const VALIDATION_TITLE_CODE: &str = "VALIDATION/TITLE";
const VALIDATION_STEP_CODE: &str = "VALIDATION/STEP";
const VALIDATION_ENUM_CODE: &str = "VALIDATION/ENUM";

/// The four named values kept in the medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Tasks,
    Habits,
    Roadmaps,
    Profile,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Tasks,
        Collection::Habits,
        Collection::Roadmaps,
        Collection::Profile,
    ];

    /// Storage key the collection is serialized under.
    pub fn key(self) -> &'static str {
        match self {
            Collection::Tasks => "taskforge_tasks",
            Collection::Habits => "taskforge_habits",
            Collection::Roadmaps => "taskforge_roadmaps",
            Collection::Profile => "taskforge_profile",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::Habits => "habits",
            Collection::Roadmaps => "roadmaps",
            Collection::Profile => "profile",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record that lives in one of the id-keyed collections.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// Checks invariants serde cannot express. Called before every write and
    /// on every record read back from the medium.
    fn validate(&self) -> AppResult<()>;
}

fn require_non_empty(
    value: &str,
    code: &'static str,
    field: &'static str,
    collection: Collection,
) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::new(code, format!("{field} must not be empty"))
            .with_context("field", field)
            .with_context("collection", collection.name()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(AppError::new(VALIDATION_ENUM_CODE, "Unknown priority")
                .with_context("value", other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "todo" => Ok(TaskStatus::ToDo),
            "inprogress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(AppError::new(VALIDATION_ENUM_CODE, "Unknown task status")
                .with_context("value", raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub due_date: NaiveDate,
    pub category: String,
    /// Weak link to a roadmap; never checked for existence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roadmap_id: Option<String>,
}

impl Task {
    pub fn new(
        title: impl Into<String>,
        priority: Priority,
        status: TaskStatus,
        due_date: NaiveDate,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: new_uuid_v7(),
            title: title.into(),
            description: None,
            priority,
            status,
            due_date,
            category: category.into(),
            roadmap_id: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

impl Record for Task {
    const COLLECTION: Collection = Collection::Tasks;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> AppResult<()> {
        require_non_empty(&self.id, VALIDATION_ID_CODE, "id", Self::COLLECTION)?;
        require_non_empty(&self.title, VALIDATION_TITLE_CODE, "title", Self::COLLECTION)
    }
}

/// Dates on which a habit was completed.
///
/// Serialized as `{"YYYY-MM-DD": true, ...}`. On read only `true` entries with
/// a valid calendar-date key are kept; anything else counts as "not done".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitHistory(BTreeSet<NaiveDate>);

impl HabitHistory {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }

    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.0.insert(date)
    }

    pub fn remove(&mut self, date: NaiveDate) -> bool {
        self.0.remove(&date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Completed dates in ascending order.
    pub fn dates(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<NaiveDate> for HabitHistory {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for HabitHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for date in &self.0 {
            map.serialize_entry(&time::date_key(*date), &true)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HabitHistory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter(|(_, done)| matches!(done, Value::Bool(true)))
            .filter_map(|(key, _)| time::parse_date_key(&key))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub history: HabitHistory,
    pub category: String,
}

impl Habit {
    pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: new_uuid_v7(),
            title: title.into(),
            streak: 0,
            history: HabitHistory::default(),
            category: category.into(),
        }
    }

    pub fn is_done_on(&self, date: NaiveDate) -> bool {
        self.history.contains(date)
    }
}

impl Record for Habit {
    const COLLECTION: Collection = Collection::Habits;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> AppResult<()> {
        require_non_empty(&self.id, VALIDATION_ID_CODE, "id", Self::COLLECTION)?;
        require_non_empty(&self.title, VALIDATION_TITLE_CODE, "title", Self::COLLECTION)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapStep {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Ordered learning progression.
    #[serde(default)]
    pub steps: Vec<RoadmapStep>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_ai_generated: bool,
}

/// `createdAt` is informational only: a missing or unreadable value reads as
/// the Unix epoch rather than dropping the whole roadmap.
fn lenient_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw.as_str().and_then(time::parse_timestamp) {
        Some(at) => at,
        None => {
            warn!(
                target: "taskforge",
                event = "timestamp_defaulted",
                field = "createdAt",
                value = %raw
            );
            DateTime::<Utc>::default()
        }
    })
}

impl Roadmap {
    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut RoadmapStep> {
        self.steps.iter_mut().find(|step| step.id == step_id)
    }

    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|step| step.completed).count()
    }
}

impl Record for Roadmap {
    const COLLECTION: Collection = Collection::Roadmaps;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> AppResult<()> {
        require_non_empty(&self.id, VALIDATION_ID_CODE, "id", Self::COLLECTION)?;
        let mut seen = HashSet::with_capacity(self.steps.len());
        for step in &self.steps {
            require_non_empty(&step.id, VALIDATION_STEP_CODE, "step.id", Self::COLLECTION)?;
            if !seen.insert(step.id.as_str()) {
                return Err(AppError::new(VALIDATION_STEP_CODE, "Duplicate step id")
                    .with_context("roadmap_id", self.id.clone())
                    .with_context("step_id", step.id.clone()));
            }
        }
        Ok(())
    }
}

pub const DEFAULT_USERNAME: &str = "Demo User";
pub const DEFAULT_EMAIL: &str = "user@example.com";

/// Singleton profile. Missing fields are filled from [`UserProfile::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub dark_mode: bool,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            email: DEFAULT_EMAIL.to_string(),
            avatar_url: None,
            dark_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(raw: &str) -> NaiveDate {
        time::parse_date_key(raw).unwrap()
    }

    #[test]
    fn task_uses_web_field_names_and_status_labels() {
        let mut task = Task::new(
            "Read",
            Priority::Medium,
            TaskStatus::InProgress,
            date("2024-05-01"),
            "Learning",
        );
        task.id = "t1".into();
        task.roadmap_id = Some("r1".into());

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["dueDate"], "2024-05-01");
        assert_eq!(value["status"], "In Progress");
        assert_eq!(value["priority"], "Medium");
        assert_eq!(value["roadmapId"], "r1");
        assert!(value.get("description").is_none());
    }

    #[test]
    fn task_missing_required_field_fails_to_decode() {
        let payload = json!({
            "id": "1",
            "title": "No status",
            "priority": "Low",
            "dueDate": "2024-05-01",
            "category": "Work"
        });
        assert!(serde_json::from_value::<Task>(payload).is_err());
    }

    #[test]
    fn task_validation_rejects_blank_title() {
        let task = Task::new("   ", Priority::Low, TaskStatus::ToDo, date("2024-05-01"), "Work");
        let err = task.validate().unwrap_err();
        assert_eq!(err.code(), VALIDATION_TITLE_CODE);
        assert_eq!(err.context().get("collection"), Some(&"tasks".to_string()));
    }

    #[test]
    fn status_and_priority_parse_loosely() {
        assert_eq!("to do".parse::<TaskStatus>().unwrap(), TaskStatus::ToDo);
        assert_eq!("In-Progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("DONE".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn history_keeps_only_true_dates() {
        let payload = json!({
            "id": "h1",
            "title": "Meditate",
            "streak": 2,
            "category": "Health",
            "history": {
                "2024-05-01": true,
                "2024-05-02": false,
                "not-a-date": true,
                "2024-05-03": 1
            }
        });
        let habit: Habit = serde_json::from_value(payload).unwrap();
        assert_eq!(habit.history.len(), 1);
        assert!(habit.is_done_on(date("2024-05-01")));
    }

    #[test]
    fn history_serializes_as_date_to_true_map() {
        let mut habit = Habit::new("Code", "Learning");
        habit.history.insert(date("2024-05-02"));
        habit.history.insert(date("2024-05-01"));
        let value = serde_json::to_value(&habit).unwrap();
        assert_eq!(value["history"], json!({"2024-05-01": true, "2024-05-02": true}));
    }

    #[test]
    fn habit_defaults_missing_streak_and_history() {
        let habit: Habit = serde_json::from_value(json!({
            "id": "h1",
            "title": "Walk",
            "category": "Health"
        }))
        .unwrap();
        assert_eq!(habit.streak, 0);
        assert!(habit.history.is_empty());
    }

    #[test]
    fn roadmap_rejects_duplicate_step_ids() {
        let step = RoadmapStep {
            id: "s1".into(),
            title: "Basics".into(),
            description: String::new(),
            deadline: None,
            completed: false,
            resources: None,
        };
        let roadmap = Roadmap {
            id: "r1".into(),
            title: "Rust".into(),
            description: String::new(),
            steps: vec![step.clone(), step],
            created_at: Utc::now(),
            is_ai_generated: false,
        };
        assert_eq!(roadmap.validate().unwrap_err().code(), VALIDATION_STEP_CODE);
    }

    #[test]
    fn roadmap_created_at_is_read_leniently() {
        let roadmap = |created_at: Value| {
            serde_json::from_value::<Roadmap>(json!({
                "id": "r1",
                "title": "Rust",
                "createdAt": created_at
            }))
            .unwrap()
            .created_at
        };
        assert_eq!(
            roadmap(json!("2024-05-01T08:30:00.000Z")),
            time::parse_timestamp("2024-05-01T08:30:00Z").unwrap()
        );
        assert_eq!(roadmap(json!("yesterday")), DateTime::<Utc>::default());
        assert_eq!(roadmap(json!(1714552200)), DateTime::<Utc>::default());

        let missing: Roadmap = serde_json::from_value(json!({"id": "r2", "title": "Go"})).unwrap();
        assert_eq!(missing.created_at, DateTime::<Utc>::default());
    }

    #[test]
    fn profile_default_fills_missing_fields() {
        let profile: UserProfile = serde_json::from_value(json!({"darkMode": true})).unwrap();
        assert_eq!(profile.username, DEFAULT_USERNAME);
        assert_eq!(profile.email, DEFAULT_EMAIL);
        assert!(profile.dark_mode);
        assert!(profile.avatar_url.is_none());
    }
}
