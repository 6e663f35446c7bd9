//! Workout history loading and stats.
//!
//! Recent completed workouts come from both the WAL and the CSV archive;
//! the stats feed the dashboard-style summary.

use crate::csv_rollup::CsvRow;
use crate::wal::CompletedWorkout;
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

impl TryFrom<CsvRow> for CompletedWorkout {
    type Error = crate::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| crate::Error::Other(format!("Invalid UUID: {}", e)))?;

        let performed_at = DateTime::parse_from_rfc3339(&row.performed_at)
            .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))?
            .with_timezone(&Utc);

        Ok(CompletedWorkout {
            id,
            workout_id: row.workout_id,
            name: row.name,
            performed_at,
            total_time: row.total_time,
            calories: row.calories,
            completion_percent: row.completion_percent,
            completed_exercises: vec![], // Not stored in CSV
        })
    }
}

/// Load workouts from the last N days from both WAL and CSV
///
/// Returns workouts sorted by performed_at (newest first), deduplicated
/// across the two sources.
pub fn load_recent_workouts(
    wal_path: &Path,
    csv_path: &Path,
    days: i64,
) -> Result<Vec<CompletedWorkout>> {
    let cutoff = Utc::now() - Duration::days(days);
    let mut workouts = Vec::new();
    let mut seen_ids = HashSet::new();

    if wal_path.exists() {
        for workout in crate::wal::read_completed(wal_path)? {
            if workout.performed_at >= cutoff && seen_ids.insert(workout.id) {
                workouts.push(workout);
            }
        }
        tracing::debug!("Loaded {} workouts from WAL", workouts.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for workout in load_workouts_from_csv(csv_path)? {
            if workout.performed_at >= cutoff && seen_ids.insert(workout.id) {
                workouts.push(workout);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} workouts from CSV", csv_count);
    }

    workouts.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));

    tracing::info!(
        "Loaded {} total workouts from last {} days",
        workouts.len(),
        days
    );

    Ok(workouts)
}

fn load_workouts_from_csv(path: &Path) -> Result<Vec<CompletedWorkout>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut workouts = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result.map_err(crate::Error::from).and_then(CompletedWorkout::try_from) {
            Ok(workout) => workouts.push(workout),
            Err(e) => tracing::warn!("Skipping CSV row: {}", e),
        }
    }

    Ok(workouts)
}

/// Totals over a set of completed workouts
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct WorkoutStats {
    pub workouts: usize,
    pub total_seconds: u64,
    pub total_calories: u64,
    pub last_workout_at: Option<DateTime<Utc>>,
    /// Most frequently completed workout name
    pub favourite: Option<String>,
}

impl WorkoutStats {
    pub fn from_workouts(workouts: &[CompletedWorkout]) -> Self {
        let mut counts: std::collections::BTreeMap<&str, usize> = Default::default();
        for workout in workouts {
            *counts.entry(workout.name.as_str()).or_insert(0) += 1;
        }

        // Ties go to the alphabetically first name
        let favourite = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(name, _)| name.to_string());

        Self {
            workouts: workouts.len(),
            total_seconds: workouts.iter().map(|w| u64::from(w.total_time)).sum(),
            total_calories: workouts.iter().map(|w| u64::from(w.calories)).sum(),
            last_workout_at: workouts.iter().map(|w| w.performed_at).max(),
            favourite,
        }
    }
}
