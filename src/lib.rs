//! Local data store for tasks, habits and learning roadmaps.
//!
//! [`LocalStore`] keeps four collections (tasks, habits, roadmaps and the
//! profile singleton) in a pluggable key-value medium ([`StoreHandle`]). The
//! [`planner`] module asks a generative-language API for a learning plan and
//! composes it into store records.

pub mod config;
pub mod error;
pub mod id;
pub mod logging;
pub mod model;
pub mod planner;
pub mod seed;
pub mod stats;
pub mod storage;
pub mod store;
pub mod streak;
pub mod theme;
pub mod time;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use logging::init_logging;
pub use model::{
    Collection, Habit, HabitHistory, Priority, Record, Roadmap, RoadmapStep, Task, TaskStatus,
    UserProfile,
};
pub use seed::SeedData;
pub use storage::{write_atomic, KeyValueStore, StoreHandle};
pub use store::{ExportBundle, LocalStore};
pub use streak::StreakMode;
pub use theme::ThemeSync;
