//! Core domain types for the Fit workout session system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Workout and exercise definitions (as delivered by the catalog)
//! - Session phases and the mutable session state
//! - Session timing parameters

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Workout Definition Types
// ============================================================================

/// Configured exercise duration as it arrives from the catalog.
///
/// Catalog data is loosely typed: durations show up as numbers, as numeric
/// strings, or as junk. The duration resolver decides what each one means.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DurationHint {
    Seconds(f64),
    Text(String),
    Other(serde_json::Value),
}

/// A single exercise within a workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDefinition {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub met: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_per_second: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_per_minute: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<String>,
}

impl ExerciseDefinition {
    /// Exercise with a name and a duration in seconds, no calorie hints
    pub fn timed(name: impl Into<String>, seconds: u32) -> Self {
        Self {
            name: name.into(),
            duration: Some(DurationHint::Seconds(f64::from(seconds))),
            ..Self::default()
        }
    }
}

/// A complete workout definition
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDefinition {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub exercises: Vec<ExerciseDefinition>,
}

impl WorkoutDefinition {
    /// Check that the workout can be run as a session.
    ///
    /// A workout needs at least one exercise and every exercise needs a name.
    pub fn validate(&self) -> Result<()> {
        if self.exercises.is_empty() {
            return Err(Error::InvalidDefinition(format!(
                "workout '{}' has no exercises",
                self.id
            )));
        }

        if let Some(position) = self.exercises.iter().position(|ex| ex.name.trim().is_empty()) {
            return Err(Error::InvalidDefinition(format!(
                "workout '{}': exercise {} has no name",
                self.id,
                position + 1
            )));
        }

        Ok(())
    }

    /// Lightweight reference used in snapshots and completion records
    pub fn workout_ref(&self) -> WorkoutRef {
        WorkoutRef {
            id: self.id.clone(),
            name: self.name.clone(),
            intensity: self.intensity.clone(),
        }
    }
}

/// Identifies the workout a session or record belongs to
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub intensity: Option<String>,
}

// ============================================================================
// Session Types
// ============================================================================

/// The session's current mode
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    Countdown,
    Working,
    OnBreak,
    Completed,
}

impl Phase {
    /// Phases driven by the interval clock
    pub fn is_clocked(self) -> bool {
        matches!(self, Phase::Working | Phase::OnBreak)
    }

    /// Phases during which a tick source is outstanding
    pub fn is_live(self) -> bool {
        matches!(self, Phase::Countdown | Phase::Working | Phase::OnBreak)
    }
}

/// Mutable state of a guided workout session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub current_exercise_index: usize,
    pub remaining_seconds: u32,
    pub countdown_remaining: u32,
    pub is_running: bool,
    pub completed_exercises: Vec<ExerciseDefinition>,
    /// Worked seconds per exercise index (breaks and countdowns excluded)
    pub per_exercise_elapsed_seconds: BTreeMap<usize, u32>,
    /// Work plus break seconds since the session started
    pub total_elapsed_seconds: u32,
}

impl SessionState {
    /// Fresh state for a session whose first exercise lasts `first_duration`
    pub fn initial(first_duration: u32) -> Self {
        Self {
            phase: Phase::NotStarted,
            current_exercise_index: 0,
            remaining_seconds: first_duration,
            countdown_remaining: 0,
            is_running: false,
            completed_exercises: Vec::new(),
            per_exercise_elapsed_seconds: BTreeMap::new(),
            total_elapsed_seconds: 0,
        }
    }

    /// Worked seconds recorded for one exercise
    pub fn elapsed_for(&self, index: usize) -> u32 {
        self.per_exercise_elapsed_seconds
            .get(&index)
            .copied()
            .unwrap_or(0)
    }
}

/// Fixed lengths of the session's timed phases
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTimings {
    #[serde(default = "default_countdown_seconds")]
    pub countdown_seconds: u32,
    #[serde(default = "default_break_seconds")]
    pub break_seconds: u32,
    #[serde(default = "default_exercise_seconds")]
    pub default_exercise_seconds: u32,
}

/// Pre-work countdown length
pub const COUNTDOWN_SECONDS: u32 = 3;
/// Rest between exercises
pub const BREAK_SECONDS: u32 = 15;
/// Used when an exercise carries no usable duration
pub const DEFAULT_EXERCISE_SECONDS: u32 = 180;

fn default_countdown_seconds() -> u32 {
    COUNTDOWN_SECONDS
}

fn default_break_seconds() -> u32 {
    BREAK_SECONDS
}

fn default_exercise_seconds() -> u32 {
    DEFAULT_EXERCISE_SECONDS
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            countdown_seconds: COUNTDOWN_SECONDS,
            break_seconds: BREAK_SECONDS,
            default_exercise_seconds: DEFAULT_EXERCISE_SECONDS,
        }
    }
}

impl SessionTimings {
    /// Reject timings that would make a phase end before it starts
    pub fn validate(&self) -> Result<()> {
        if self.countdown_seconds == 0 {
            return Err(Error::Config("countdown_seconds must be positive".into()));
        }
        if self.break_seconds == 0 {
            return Err(Error::Config("break_seconds must be positive".into()));
        }
        if self.default_exercise_seconds == 0 {
            return Err(Error::Config(
                "default_exercise_seconds must be positive".into(),
            ));
        }
        Ok(())
    }
}
