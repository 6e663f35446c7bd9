//! CSV rollup functionality for archiving the completed-workout WAL.
//!
//! This module implements atomic WAL-to-CSV conversion with proper error handling
//! to prevent data loss.

use crate::wal::CompletedWorkout;
use crate::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// A row in the CSV output
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(crate) struct CsvRow {
    pub id: String,
    pub workout_id: String,
    pub name: String,
    pub performed_at: String,
    pub total_time: u32,
    pub calories: u32,
    pub completion_percent: u32,
    pub exercises: usize,
}

impl From<&CompletedWorkout> for CsvRow {
    fn from(workout: &CompletedWorkout) -> Self {
        CsvRow {
            id: workout.id.to_string(),
            workout_id: workout.workout_id.clone(),
            name: workout.name.clone(),
            performed_at: workout.performed_at.to_rfc3339(),
            total_time: workout.total_time,
            calories: workout.calories,
            completion_percent: workout.completion_percent,
            exercises: workout.completed_exercises.len(),
        }
    }
}

/// Roll up WAL workouts into CSV and archive the WAL atomically
///
/// This function:
/// 1. Reads all workouts from the WAL
/// 2. Appends them to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the WAL to a timestamped `.processed` file
/// 5. Returns the number of workouts processed
///
/// The CSV is fsynced before the WAL is renamed, and the WAL is renamed
/// rather than deleted so it can be recovered by hand.
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let workouts = crate::wal::read_completed(wal_path)?;

    if workouts.is_empty() {
        tracing::info!("No workouts in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Only a brand-new file gets a header row
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for workout in &workouts {
        writer.serialize(CsvRow::from(workout))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} workouts to CSV", workouts.len());

    let processed_path = processed_path_for(wal_path);
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(workouts.len())
}

/// `<name>.<timestamp>.processed` next to the WAL, so repeated rollups never
/// overwrite an earlier archive
fn processed_path_for(wal_path: &Path) -> PathBuf {
    let file_name = wal_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "completed_workouts.wal".to_string());
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6f");
    wal_path.with_file_name(format!("{}.{}.processed", file_name, stamp))
}

/// Clean up old processed WAL files
///
/// This removes all .processed files in the given directory.
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{CompletionSink, JsonlSink};
    use std::fs::File;
    use uuid::Uuid;

    fn create_test_workout(workout_id: &str) -> CompletedWorkout {
        CompletedWorkout {
            id: Uuid::new_v4(),
            workout_id: workout_id.into(),
            name: "Test".into(),
            performed_at: Utc::now(),
            total_time: 300,
            calories: 40,
            completion_percent: 100,
            completed_exercises: vec![],
        }
    }

    fn processed_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "processed"))
            .count()
    }

    #[test]
    fn test_wal_to_csv_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("completed_workouts.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        let mut sink = JsonlSink::new(&wal_path);
        for i in 0..3 {
            sink.append(&create_test_workout(&format!("w{}", i))).unwrap();
        }

        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 3);

        assert!(csv_path.exists());
        assert!(!wal_path.exists());
        assert_eq!(processed_files(temp_dir.path()), 1);
    }

    #[test]
    fn test_wal_to_csv_appends() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("completed_workouts.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        JsonlSink::new(&wal_path)
            .append(&create_test_workout("w1"))
            .unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        JsonlSink::new(&wal_path)
            .append(&create_test_workout("w2"))
            .unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 2);
        // Second archive did not replace the first
        assert_eq!(processed_files(temp_dir.path()), 2);
    }

    #[test]
    fn test_empty_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("empty.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        File::create(&wal_path).unwrap();

        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 0);
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_cleanup_processed_wals() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("a.wal.1.processed")).unwrap();
        File::create(temp_dir.path().join("a.wal.2.processed")).unwrap();
        File::create(temp_dir.path().join("keep.wal")).unwrap();

        assert_eq!(cleanup_processed_wals(temp_dir.path()).unwrap(), 2);
        assert!(temp_dir.path().join("keep.wal").exists());
    }
}
