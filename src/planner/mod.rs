//! AI learning-plan generation.
//!
//! A [`PlanGenerator`] turns a [`PlanRequest`] into a [`PlanResponse`]; the
//! response is then composed into store records with
//! [`PlanResponse::into_records`]. The store itself never sees the response
//! shape.

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::new_uuid_v7;
use crate::model::{Habit, Record, Roadmap, RoadmapStep};
use crate::store::LocalStore;
use crate::{AppError, AppResult};

pub mod gemini;
pub mod mock;

pub use gemini::GeminiPlanner;
pub use mock::StaticPlanner;

/// Category given to habits suggested by a plan.
pub const PLAN_HABIT_CATEGORY: &str = "Learning";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub goal: String,
    pub duration: String,
    pub time_per_day: String,
    pub skill_level: String,
}

impl PlanRequest {
    pub fn prompt(&self) -> String {
        format!(
            "I need a learning and productivity plan.\n\
             Goal: {}\n\
             Duration: {}\n\
             Time Available: {}\n\
             Current Skill Level: {}\n\n\
             Create a structured roadmap with sequential steps and daily habit suggestions.",
            self.goal, self.duration, self.time_per_day, self.skill_level
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub title: String,
    pub description: String,
    pub deadline_offset_days: i64,
    #[serde(default)]
    pub suggested_resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub roadmap_title: String,
    pub roadmap_description: String,
    pub steps: Vec<PlanStep>,
    pub daily_habits: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("API key is missing. Please check your configuration.")]
    MissingApiKey,
    #[error("network error: {0}")]
    Transport(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("could not parse plan: {0}")]
    Parse(String),
    #[error("no content received from the model")]
    EmptyResponse,
}

impl PlanError {
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::MissingApiKey => "PLAN/CONFIG",
            PlanError::Transport(_) => "PLAN/TRANSPORT",
            PlanError::Http { .. } => "PLAN/HTTP",
            PlanError::Parse(_) => "PLAN/PARSE",
            PlanError::EmptyResponse => "PLAN/EMPTY",
        }
    }
}

impl From<PlanError> for AppError {
    fn from(error: PlanError) -> Self {
        let app_error = AppError::new(error.code(), error.to_string());
        match error {
            PlanError::Http { status, .. } => app_error.with_context("status", status.to_string()),
            _ => app_error,
        }
    }
}

#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Single request, no retry.
    async fn generate(&self, request: &PlanRequest) -> Result<PlanResponse, PlanError>;
}

/// Records composed from a plan, ready to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRecords {
    pub roadmap: Roadmap,
    pub habits: Vec<Habit>,
}

impl PlannedRecords {
    /// Save the roadmap, then each habit. Every record is validated first, so
    /// an invalid plan writes nothing; a medium failure part way through can
    /// still leave the roadmap saved without all of its habits.
    pub fn save_into(self, store: &LocalStore) -> AppResult<PlannedRecords> {
        self.roadmap.validate()?;
        self.habits.iter().try_for_each(|habit| habit.validate())?;

        let roadmap = store.save_roadmap(self.roadmap)?;
        let habits = self
            .habits
            .into_iter()
            .map(|habit| store.save_habit(habit))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PlannedRecords { roadmap, habits })
    }
}

fn offset_date(today: NaiveDate, offset_days: i64) -> Option<NaiveDate> {
    let days = Days::new(offset_days.unsigned_abs());
    if offset_days >= 0 {
        today.checked_add_days(days)
    } else {
        today.checked_sub_days(days)
    }
}

impl PlanResponse {
    /// Give every step and habit a fresh id, turn deadline offsets into dates
    /// counted from `today`, and flag the roadmap as AI generated. Blank habit
    /// suggestions are dropped.
    pub fn into_records(self, today: NaiveDate, now: DateTime<Utc>) -> PlannedRecords {
        let steps = self
            .steps
            .into_iter()
            .map(|step| RoadmapStep {
                id: new_uuid_v7(),
                title: step.title,
                description: step.description,
                deadline: offset_date(today, step.deadline_offset_days),
                completed: false,
                resources: Some(step.suggested_resources).filter(|r| !r.is_empty()),
            })
            .collect();

        let roadmap = Roadmap {
            id: new_uuid_v7(),
            title: self.roadmap_title,
            description: self.roadmap_description,
            steps,
            created_at: now,
            is_ai_generated: true,
        };

        let habits = self
            .daily_habits
            .into_iter()
            .filter(|title| !title.trim().is_empty())
            .map(|title| Habit::new(title, PLAN_HABIT_CATEGORY))
            .collect();

        PlannedRecords { roadmap, habits }
    }
}
