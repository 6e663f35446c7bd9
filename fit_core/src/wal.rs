//! Write-Ahead Log (WAL) for completed workouts.
//!
//! Finished sessions are appended to a JSONL (JSON Lines) file with file
//! locking to ensure safe concurrent access.

use crate::calories::WorkoutSummary;
use crate::{CompletionRecord, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One exercise of a saved workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletedExercise {
    pub name: String,
    pub time_spent: u32,
    pub calories: u32,
}

/// A finished workout with its calorie estimate, as stored in the log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletedWorkout {
    pub id: Uuid,
    pub workout_id: String,
    pub name: String,
    pub performed_at: DateTime<Utc>,
    pub total_time: u32,
    pub calories: u32,
    #[serde(default)]
    pub completion_percent: u32,
    #[serde(default)]
    pub completed_exercises: Vec<CompletedExercise>,
}

impl CompletedWorkout {
    pub fn from_completion(record: &CompletionRecord, summary: &WorkoutSummary) -> Self {
        let name = if record.workout_ref.name.trim().is_empty() {
            "Completed Workout".to_string()
        } else {
            record.workout_ref.name.clone()
        };

        Self {
            id: record.id,
            workout_id: record.workout_ref.id.clone(),
            name,
            performed_at: record.completed_at,
            total_time: summary.total_seconds,
            calories: summary.total_calories,
            completion_percent: summary.completion_percent,
            completed_exercises: summary
                .exercises
                .iter()
                .map(|e| CompletedExercise {
                    name: e.name.clone(),
                    time_spent: e.seconds,
                    calories: e.calories.round().max(0.0) as u32,
                })
                .collect(),
        }
    }
}

/// Destination for completed workouts
pub trait CompletionSink {
    fn append(&mut self, workout: &CompletedWorkout) -> Result<()>;
}

/// JSONL-based completion sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl CompletionSink for JsonlSink {
    fn append(&mut self, workout: &CompletedWorkout) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let torn = ends_mid_line(&file)?;
        let mut writer = std::io::BufWriter::new(&file);
        if torn {
            tracing::warn!("WAL {:?} ends with a partial line, starting a new one", self.path);
            writer.write_all(b"\n")?;
        }
        let line = serde_json::to_string(workout)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended workout {} to WAL", workout.id);
        Ok(())
    }
}

/// Whether the last byte of a non-empty file is something other than `\n`
fn ends_mid_line(mut file: &File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Read all completed workouts from a WAL file
pub fn read_completed(path: &Path) -> Result<Vec<CompletedWorkout>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut workouts = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<CompletedWorkout>(&line) {
            Ok(workout) => workouts.push(workout),
            Err(e) => {
                // Keep reading; a torn last line must not hide earlier entries
                tracing::warn!("Failed to parse workout at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} workouts from WAL", workouts.len());
    Ok(workouts)
}
