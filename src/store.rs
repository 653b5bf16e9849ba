//! Local data store: whole-collection CRUD over a [`StoreHandle`] medium.
//!
//! Every collection lives under one key as a JSON array (the profile as a JSON
//! object). Reads tolerate missing or corrupt values and fall back to an empty
//! collection or the default profile. Writes rewrite the whole collection and
//! flush the medium before returning; a failed flush leaves the medium as it
//! was before the write.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::model::{Collection, Habit, Record, Roadmap, Task, UserProfile};
use crate::seed::SeedData;
use crate::storage::StoreHandle;
use crate::streak::{self, StreakMode};
use crate::theme::ThemeSync;
use crate::{time, AppError, AppResult};

/// Snapshot of every collection, as produced by [`LocalStore::export_all`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub tasks: Vec<Task>,
    pub habits: Vec<Habit>,
    pub roadmaps: Vec<Roadmap>,
    pub profile: UserProfile,
}

#[derive(Clone)]
pub struct LocalStore {
    medium: StoreHandle,
    streak_mode: StreakMode,
    theme: Option<Arc<dyn ThemeSync>>,
}

impl LocalStore {
    pub fn new(medium: StoreHandle) -> Self {
        Self {
            medium,
            streak_mode: StreakMode::default(),
            theme: None,
        }
    }

    pub fn with_streak_mode(mut self, mode: StreakMode) -> Self {
        self.streak_mode = mode;
        self
    }

    pub fn with_theme(mut self, theme: Arc<dyn ThemeSync>) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn streak_mode(&self) -> StreakMode {
        self.streak_mode
    }

    /// Seed every collection that has no stored value yet. Existing values,
    /// corrupt ones included, are never overwritten. Returns the collections
    /// that were seeded.
    pub fn initialize(&self, seed: &SeedData) -> AppResult<Vec<Collection>> {
        let mut writes = Vec::new();

        if self.is_absent(Collection::Tasks) {
            writes.push(encode(Collection::Tasks, &seed.tasks)?);
        }
        if self.is_absent(Collection::Habits) {
            writes.push(encode(Collection::Habits, &seed.habits)?);
        }
        if self.is_absent(Collection::Roadmaps) {
            writes.push(encode(Collection::Roadmaps, &seed.roadmaps)?);
        }
        if self.is_absent(Collection::Profile) {
            writes.push(encode(Collection::Profile, &UserProfile::default())?);
        }

        let seeded: Vec<Collection> = writes.iter().map(|(collection, _)| *collection).collect();
        if !seeded.is_empty() {
            self.commit(&writes)?;
            let names: Vec<&str> = seeded.iter().map(|c| c.name()).collect();
            info!(target: "taskforge", event = "store_seeded", collections = ?names);
        }
        Ok(seeded)
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        self.load()
    }

    pub fn list_habits(&self) -> Vec<Habit> {
        self.load()
    }

    pub fn list_roadmaps(&self) -> Vec<Roadmap> {
        self.load()
    }

    pub fn get_task(&self, id: &str) -> Option<Task> {
        self.find(id)
    }

    pub fn get_habit(&self, id: &str) -> Option<Habit> {
        self.find(id)
    }

    pub fn get_roadmap(&self, id: &str) -> Option<Roadmap> {
        self.find(id)
    }

    pub fn save_task(&self, task: Task) -> AppResult<Task> {
        self.upsert(task)
    }

    pub fn save_habit(&self, habit: Habit) -> AppResult<Habit> {
        self.upsert(habit)
    }

    pub fn save_roadmap(&self, roadmap: Roadmap) -> AppResult<Roadmap> {
        self.upsert(roadmap)
    }

    /// Returns whether a task was removed. Tasks are independent of roadmaps,
    /// so nothing else is touched.
    pub fn delete_task(&self, id: &str) -> AppResult<bool> {
        self.remove::<Task>(id)
    }

    /// Returns whether a roadmap was removed. Tasks linked to it keep their
    /// now-dangling `roadmap_id`.
    pub fn delete_roadmap(&self, id: &str) -> AppResult<bool> {
        self.remove::<Roadmap>(id)
    }

    /// Mark `date` done if it was not, or not done if it was, and adjust the
    /// streak per the store's [`StreakMode`]. An unknown habit is a no-op and
    /// yields `Ok(None)`.
    pub fn toggle_habit_for_date(&self, habit_id: &str, date: NaiveDate) -> AppResult<Option<Habit>> {
        let Some(mut habit) = self.find::<Habit>(habit_id) else {
            debug!(
                target: "taskforge",
                event = "habit_toggle_skipped",
                reason = "not_found",
                habit_id
            );
            return Ok(None);
        };

        let done = streak::toggle(&mut habit, date, self.streak_mode);
        let saved = self.upsert(habit)?;
        info!(
            target: "taskforge",
            event = "habit_toggled",
            habit_id,
            date = %time::date_key(date),
            done,
            streak = saved.streak,
            mode = %self.streak_mode
        );
        Ok(Some(saved))
    }

    /// Zero every habit's streak. History is kept.
    pub fn reset_streaks(&self) -> AppResult<Vec<Habit>> {
        let mut habits = self.list_habits();
        for habit in &mut habits {
            habit.streak = 0;
        }
        self.store_collection(&habits)?;
        info!(target: "taskforge", event = "streaks_reset", habits = habits.len());
        Ok(habits)
    }

    /// Flip one step's `completed` flag. Unknown roadmap or step is a no-op.
    pub fn toggle_roadmap_step(&self, roadmap_id: &str, step_id: &str) -> AppResult<Option<Roadmap>> {
        let Some(mut roadmap) = self.find::<Roadmap>(roadmap_id) else {
            return Ok(None);
        };
        let Some(step) = roadmap.step_mut(step_id) else {
            return Ok(None);
        };
        step.completed = !step.completed;
        self.upsert(roadmap).map(Some)
    }

    /// The profile singleton. Seeds and returns the defaults when nothing is
    /// stored; a corrupt value reads as the defaults without being replaced.
    pub fn get_profile(&self) -> UserProfile {
        let key = Collection::Profile.key();
        let Some(raw) = self.medium.read(key).filter(|raw| !raw.is_empty()) else {
            let profile = UserProfile::default();
            if let Err(err) = self.write_profile(&profile) {
                warn!(
                    target: "taskforge",
                    event = "profile_seed_failed",
                    error = %err
                );
            }
            return profile;
        };

        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) => profile,
            Err(err) => {
                warn!(
                    target: "taskforge",
                    event = "collection_parse_failed",
                    collection = Collection::Profile.name(),
                    error = %err
                );
                UserProfile::default()
            }
        }
    }

    /// Replace the profile and push its dark-mode flag to the theme hook.
    pub fn save_profile(&self, profile: UserProfile) -> AppResult<UserProfile> {
        self.write_profile(&profile)?;
        info!(
            target: "taskforge",
            event = "profile_saved",
            dark_mode = profile.dark_mode
        );
        self.apply_theme(&profile);
        Ok(profile)
    }

    /// Push the stored dark-mode flag to the theme hook, e.g. at startup.
    pub fn sync_theme(&self) -> UserProfile {
        let profile = self.get_profile();
        self.apply_theme(&profile);
        profile
    }

    pub fn snapshot(&self) -> ExportBundle {
        ExportBundle {
            tasks: self.list_tasks(),
            habits: self.list_habits(),
            roadmaps: self.list_roadmaps(),
            profile: self.get_profile(),
        }
    }

    /// Serialize every collection into one JSON document with the keys
    /// `tasks`, `habits`, `roadmaps` and `profile`.
    pub fn export_all(&self) -> AppResult<String> {
        let document = serde_json::to_string(&self.snapshot())
            .map_err(|err| AppError::from(err).with_context("operation", "export"))?;
        info!(target: "taskforge", event = "store_exported", bytes = document.len());
        Ok(document)
    }

    fn apply_theme(&self, profile: &UserProfile) {
        if let Some(theme) = &self.theme {
            theme.apply_dark_mode(profile.dark_mode);
        }
    }

    fn write_profile(&self, profile: &UserProfile) -> AppResult<()> {
        self.commit(&[encode(Collection::Profile, profile)?])
    }

    fn is_absent(&self, collection: Collection) -> bool {
        self.medium
            .read(collection.key())
            .map_or(true, |raw| raw.is_empty())
    }

    fn load<T: Record>(&self) -> Vec<T> {
        match self
            .medium
            .read(T::COLLECTION.key())
            .filter(|raw| !raw.is_empty())
        {
            Some(raw) => decode_collection(&raw),
            None => Vec::new(),
        }
    }

    fn find<T: Record>(&self, id: &str) -> Option<T> {
        self.load::<T>().into_iter().find(|record| record.id() == id)
    }

    fn upsert<T: Record>(&self, record: T) -> AppResult<T> {
        record
            .validate()
            .map_err(|err| err.with_context("id", record.id().to_string()))?;

        let mut records = self.load::<T>();
        let replaced = match records.iter().position(|existing| existing.id() == record.id()) {
            Some(index) => {
                records[index] = record.clone();
                true
            }
            None => {
                records.push(record.clone());
                false
            }
        };
        self.store_collection(&records)?;
        debug!(
            target: "taskforge",
            event = "record_saved",
            collection = T::COLLECTION.name(),
            id = record.id(),
            replaced
        );
        Ok(record)
    }

    fn remove<T: Record>(&self, id: &str) -> AppResult<bool> {
        let mut records = self.load::<T>();
        let before = records.len();
        records.retain(|record| record.id() != id);
        let removed = records.len() != before;
        self.store_collection(&records)?;
        debug!(
            target: "taskforge",
            event = "record_deleted",
            collection = T::COLLECTION.name(),
            id,
            removed
        );
        Ok(removed)
    }

    fn store_collection<T: Record>(&self, records: &[T]) -> AppResult<()> {
        self.commit(&[encode(T::COLLECTION, records)?])
    }

    /// Stage every write and flush once. When the flush fails the previous
    /// values are restored, so the medium never holds a change the caller was
    /// told did not happen.
    fn commit(&self, writes: &[(Collection, String)]) -> AppResult<()> {
        let previous: Vec<(Collection, Option<String>)> = writes
            .iter()
            .map(|(collection, _)| (*collection, self.medium.read(collection.key())))
            .collect();
        for (collection, json) in writes {
            self.medium.write(collection.key(), json);
        }

        let Err(err) = self.medium.persist() else {
            return Ok(());
        };

        for (collection, prior) in &previous {
            match prior {
                Some(raw) => self.medium.write(collection.key(), raw),
                None => self.medium.clear(collection.key()),
            }
        }
        let names: Vec<&str> = previous.iter().map(|(c, _)| c.name()).collect();
        warn!(
            target: "taskforge",
            event = "write_rolled_back",
            collections = ?names,
            error = %err
        );
        Err(AppError::persist(names.join(","), err))
    }
}

fn encode<V: Serialize + ?Sized>(collection: Collection, value: &V) -> AppResult<(Collection, String)> {
    let json = serde_json::to_string(value)
        .map_err(|err| AppError::from(err).with_context("collection", collection.name()))?;
    Ok((collection, json))
}

/// Decode a stored JSON array, keeping every element that matches the record
/// schema. A value that is not an array decodes as empty.
fn decode_collection<T: Record>(raw: &str) -> Vec<T> {
    let collection = T::COLLECTION.name();
    let items = match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(items) => items,
        Err(err) => {
            warn!(
                target: "taskforge",
                event = "collection_parse_failed",
                collection,
                error = %err
            );
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let decoded = serde_json::from_value::<T>(item)
                .map_err(AppError::from)
                .and_then(|record| record.validate().map(|()| record));
            match decoded {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(
                        target: "taskforge",
                        event = "record_rejected",
                        collection,
                        index,
                        code = err.code(),
                        error = %err.message()
                    );
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, TaskStatus};
    use crate::time::parse_date_key;

    fn store() -> LocalStore {
        LocalStore::new(StoreHandle::in_memory())
    }

    fn task(id: &str, title: &str) -> Task {
        let mut task = Task::new(
            title,
            Priority::Low,
            TaskStatus::ToDo,
            parse_date_key("2024-05-01").unwrap(),
            "Work",
        );
        task.id = id.into();
        task
    }

    #[test]
    fn upsert_replaces_in_place() {
        let store = store();
        store.save_task(task("a", "First")).unwrap();
        store.save_task(task("b", "Second")).unwrap();
        store.save_task(task("a", "First, edited")).unwrap();

        let titles: Vec<String> = store.list_tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["First, edited", "Second"]);
    }

    #[test]
    fn invalid_record_is_not_written() {
        let store = store();
        let err = store.save_task(task("a", "")).unwrap_err();
        assert_eq!(err.code(), "VALIDATION/TITLE");
        assert_eq!(err.context().get("id"), Some(&"a".to_string()));
        assert!(store.list_tasks().is_empty());
    }

    #[test]
    fn non_array_value_reads_as_empty() {
        let medium = StoreHandle::in_memory();
        medium.write(Collection::Tasks.key(), r#"{"id":"1"}"#);
        assert!(LocalStore::new(medium).list_tasks().is_empty());
    }

    #[test]
    fn toggle_step_flips_only_the_named_step() {
        let store = store();
        let seed = SeedData::demo(parse_date_key("2024-05-01").unwrap(), chrono::Utc::now());
        store.initialize(&seed).unwrap();

        let updated = store.toggle_roadmap_step("1", "s2").unwrap().unwrap();
        let flags: Vec<bool> = updated.steps.iter().map(|s| s.completed).collect();
        assert_eq!(flags, vec![true, true, false]);

        assert!(store.toggle_roadmap_step("1", "missing").unwrap().is_none());
        assert!(store.toggle_roadmap_step("missing", "s1").unwrap().is_none());
    }

    #[test]
    fn reset_streaks_keeps_history() {
        let store = store();
        let today = parse_date_key("2024-05-01").unwrap();
        store
            .initialize(&SeedData::demo(today, chrono::Utc::now()))
            .unwrap();

        let habits = store.reset_streaks().unwrap();
        assert!(habits.iter().all(|h| h.streak == 0));
        assert!(store.get_habit("1").unwrap().is_done_on(today));
    }
}
