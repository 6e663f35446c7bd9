//! Session snapshot persistence.
//!
//! The engine writes its full state to a single storage slot after every
//! mutation, so an interrupted session can be offered for resumption the
//! next time the workout is opened. The slot is only ever read back at
//! startup; a live session never consults it.
//!
//! Storage sits behind [`SnapshotPort`] so the engine can run against a file
//! in the data directory or an in-memory map.

use crate::duration::resolve_duration_or;
use crate::{
    Error, ExerciseDefinition, Phase, Result, SessionState, SessionTimings, WorkoutDefinition,
};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::NamedTempFile;

/// Storage key of the active-session slot
pub const SESSION_KEY: &str = "fit_active_workout";

/// Key-value storage for snapshot blobs
pub trait SnapshotPort {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, blob: &str) -> Result<()>;
    fn clear(&mut self, key: &str) -> Result<()>;
}

impl<P: SnapshotPort + ?Sized> SnapshotPort for &mut P {
    fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<()> {
        (**self).save(key, blob)
    }

    fn clear(&mut self, key: &str) -> Result<()> {
        (**self).clear(key)
    }
}

// ============================================================================
// Snapshot format
// ============================================================================

/// Persisted copy of a live session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub workout_ref: String,
    pub phase: Phase,
    pub current_exercise_index: usize,
    pub remaining_seconds: u32,
    pub countdown_remaining: u32,
    pub is_running: bool,
    pub completed_exercises: Vec<ExerciseDefinition>,
    pub per_exercise_elapsed_seconds: BTreeMap<usize, u32>,
    pub total_elapsed_seconds: u32,
    pub timestamp: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn capture(workout_id: &str, state: &SessionState) -> Self {
        Self {
            workout_ref: workout_id.to_string(),
            phase: state.phase,
            current_exercise_index: state.current_exercise_index,
            remaining_seconds: state.remaining_seconds,
            countdown_remaining: state.countdown_remaining,
            is_running: state.is_running,
            completed_exercises: state.completed_exercises.clone(),
            per_exercise_elapsed_seconds: state.per_exercise_elapsed_seconds.clone(),
            total_elapsed_seconds: state.total_elapsed_seconds,
            timestamp: Utc::now(),
        }
    }

    pub fn into_state(self) -> SessionState {
        SessionState {
            phase: self.phase,
            current_exercise_index: self.current_exercise_index,
            remaining_seconds: self.remaining_seconds,
            countdown_remaining: self.countdown_remaining,
            is_running: self.is_running,
            completed_exercises: self.completed_exercises,
            per_exercise_elapsed_seconds: self.per_exercise_elapsed_seconds,
            total_elapsed_seconds: self.total_elapsed_seconds,
        }
    }

    /// Parse a stored blob. Malformed blobs are logged and read as absent.
    pub fn decode(blob: &str) -> Option<Self> {
        match serde_json::from_str::<SessionSnapshot>(blob) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Ignoring malformed session snapshot: {}", e);
                None
            }
        }
    }

    /// Structural check that this snapshot could have come from a session
    /// running `definition`.
    pub fn check_against(
        &self,
        definition: &WorkoutDefinition,
        timings: &SessionTimings,
    ) -> std::result::Result<(), String> {
        let total = definition.exercises.len();
        let index = self.current_exercise_index;
        let done = self.completed_exercises.len();

        if self.workout_ref != definition.id {
            return Err(format!(
                "snapshot belongs to workout '{}', not '{}'",
                self.workout_ref, definition.id
            ));
        }
        if index >= total {
            return Err(format!("exercise index {} out of range ({})", index, total));
        }
        if done > total {
            return Err(format!("{} completed exercises for {} planned", done, total));
        }
        if definition.exercises[..done] != self.completed_exercises[..] {
            return Err("completed exercises do not match the workout".into());
        }
        if self.per_exercise_elapsed_seconds.keys().any(|&k| k > index) {
            return Err("elapsed time recorded for a future exercise".into());
        }
        let worked: u64 = self
            .per_exercise_elapsed_seconds
            .values()
            .map(|&s| u64::from(s))
            .sum();
        if worked > u64::from(self.total_elapsed_seconds) {
            return Err("worked time exceeds total elapsed time".into());
        }

        let work_length = resolve_duration_or(
            &definition.exercises[index],
            timings.default_exercise_seconds,
        );

        match self.phase {
            Phase::NotStarted => {
                if index != 0 || done != 0 || self.is_running || self.total_elapsed_seconds != 0 {
                    return Err("not-started snapshot carries progress".into());
                }
            }
            Phase::Countdown => {
                if done != index || self.is_running {
                    return Err("inconsistent countdown snapshot".into());
                }
                if self.countdown_remaining == 0
                    || self.countdown_remaining > timings.countdown_seconds
                {
                    return Err(format!(
                        "countdown {} outside 1..={}",
                        self.countdown_remaining, timings.countdown_seconds
                    ));
                }
                if self.remaining_seconds != work_length {
                    return Err("countdown snapshot with a partially worked exercise".into());
                }
            }
            Phase::Working => {
                if done != index {
                    return Err("inconsistent work snapshot".into());
                }
                if self.remaining_seconds == 0 || self.remaining_seconds > work_length {
                    return Err(format!(
                        "work remaining {} outside 1..={}",
                        self.remaining_seconds, work_length
                    ));
                }
            }
            Phase::OnBreak => {
                if done != index + 1 || index + 1 >= total {
                    return Err("inconsistent break snapshot".into());
                }
                if self.remaining_seconds == 0 || self.remaining_seconds > timings.break_seconds {
                    return Err(format!(
                        "break remaining {} outside 1..={}",
                        self.remaining_seconds, timings.break_seconds
                    ));
                }
            }
            Phase::Completed => {
                return Err("completed sessions are not resumable".into());
            }
        }

        Ok(())
    }
}

/// Read whatever snapshot is stored, without checking it against a workout
pub fn peek<P: SnapshotPort + ?Sized>(store: &P) -> Option<SessionSnapshot> {
    match store.load(SESSION_KEY) {
        Ok(Some(blob)) => SessionSnapshot::decode(&blob),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Unable to read session snapshot: {}", e);
            None
        }
    }
}

/// Find a resumable snapshot for `definition`.
///
/// Snapshots that fail to parse, belong to another workout, or do not fit
/// the workout's shape are reported as absent.
pub fn pending_for<P: SnapshotPort + ?Sized>(
    store: &P,
    definition: &WorkoutDefinition,
    timings: &SessionTimings,
) -> Option<SessionSnapshot> {
    let snapshot = peek(store)?;
    match snapshot.check_against(definition, timings) {
        Ok(()) => Some(snapshot),
        Err(reason) => {
            tracing::warn!("Ignoring session snapshot: {}", reason);
            None
        }
    }
}

/// Overwrite the slot with `snapshot`
pub fn write<P: SnapshotPort + ?Sized>(store: &mut P, snapshot: &SessionSnapshot) -> Result<()> {
    let blob = serde_json::to_string(snapshot)?;
    store.save(SESSION_KEY, &blob)
}

/// Delete the slot
pub fn discard<P: SnapshotPort + ?Sized>(store: &mut P) -> Result<()> {
    store.clear(SESSION_KEY)
}

// ============================================================================
// Stores
// ============================================================================

/// In-memory store. Clones share the same slots.
#[derive(Clone, Debug, Default)]
pub struct MemorySnapshotStore {
    slots: Rc<RefCell<HashMap<String, String>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw blob stored under `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }

    /// Place a raw blob, bypassing the engine
    pub fn put(&self, key: &str, blob: impl Into<String>) {
        self.slots.borrow_mut().insert(key.to_string(), blob.into());
    }
}

impl SnapshotPort for MemorySnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<()> {
        self.put(key, blob);
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<()> {
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}

/// File-backed store: one `<key>.json` file per slot
#[derive(Clone, Debug)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn read_locked(path: &Path) -> Result<String> {
        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        Ok(contents)
    }
}

impl SnapshotPort for FileSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = Self::read_locked(&path)?;
        tracing::debug!("Loaded snapshot from {:?}", path);
        Ok(Some(contents))
    }

    /// Atomically replaces the slot: temp file, fsync, rename
    fn save(&mut self, key: &str, blob: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(blob.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved snapshot to {:?}", path);
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Cleared snapshot {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workout() -> WorkoutDefinition {
        WorkoutDefinition {
            id: "w1".into(),
            name: "Test".into(),
            intensity: None,
            category: None,
            exercises: vec![
                ExerciseDefinition::timed("Squats", 5),
                ExerciseDefinition::timed("Lunges", 3),
            ],
        }
    }

    fn working_state() -> SessionState {
        let mut state = SessionState::initial(5);
        state.phase = Phase::Working;
        state.is_running = true;
        state.remaining_seconds = 3;
        state.per_exercise_elapsed_seconds.insert(0, 2);
        state.total_elapsed_seconds = 2;
        state
    }

    #[test]
    fn test_file_store_save_load_clear() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileSnapshotStore::new(temp_dir.path());

        store.save(SESSION_KEY, "{\"x\":1}").unwrap();
        assert_eq!(store.load(SESSION_KEY).unwrap().as_deref(), Some("{\"x\":1}"));

        store.clear(SESSION_KEY).unwrap();
        assert!(store.load(SESSION_KEY).unwrap().is_none());

        // Clearing an empty slot is fine
        store.clear(SESSION_KEY).unwrap();
    }

    #[test]
    fn test_file_store_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileSnapshotStore::new(temp_dir.path());

        store.save(SESSION_KEY, "a").unwrap();
        store.save(SESSION_KEY, "b").unwrap();

        let names: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.json", SESSION_KEY)]);
        assert_eq!(store.load(SESSION_KEY).unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_snapshot_survives_storage() {
        let mut store = MemorySnapshotStore::new();
        let state = working_state();

        write(&mut store, &SessionSnapshot::capture("w1", &state)).unwrap();

        let pending = pending_for(&store, &workout(), &SessionTimings::default()).unwrap();
        assert_eq!(pending.into_state(), state);
    }

    #[test]
    fn test_malformed_blob_reads_as_absent() {
        let store = MemorySnapshotStore::new();
        store.put(SESSION_KEY, "{ not json");

        assert!(peek(&store).is_none());
    }

    #[test]
    fn test_other_workout_snapshot_is_ignored() {
        let mut store = MemorySnapshotStore::new();
        write(&mut store, &SessionSnapshot::capture("other", &working_state())).unwrap();

        assert!(peek(&store).is_some());
        assert!(pending_for(&store, &workout(), &SessionTimings::default()).is_none());
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut state = working_state();
        state.current_exercise_index = 7;
        let snapshot = SessionSnapshot::capture("w1", &state);

        assert!(snapshot
            .check_against(&workout(), &SessionTimings::default())
            .is_err());
    }

    #[test]
    fn test_break_after_last_exercise_is_rejected() {
        let mut state = working_state();
        state.phase = Phase::OnBreak;
        state.current_exercise_index = 1;
        state.remaining_seconds = 10;
        state.completed_exercises = workout().exercises;
        let snapshot = SessionSnapshot::capture("w1", &state);

        assert!(snapshot
            .check_against(&workout(), &SessionTimings::default())
            .is_err());
    }

    #[test]
    fn test_completed_snapshot_is_rejected() {
        let mut state = working_state();
        state.phase = Phase::Completed;
        let snapshot = SessionSnapshot::capture("w1", &state);

        let reason = snapshot
            .check_against(&workout(), &SessionTimings::default())
            .unwrap_err();
        assert!(reason.contains("not resumable"));
    }
}
