//! Calorie estimation for finished workouts.
//!
//! Each exercise is priced with the first rule its data supports:
//! 1. calories per second
//! 2. calories per minute
//! 3. MET × body weight × hours (70 kg when weight is unknown)
//! 4. MET from the intensity label (low 3, medium 6, high 8)
//! 5. a flat 0.12 kcal per second

use crate::{CompletionRecord, ExerciseDefinition};
use serde::{Deserialize, Serialize};

/// Body weight used when the profile has none
pub const ASSUMED_WEIGHT_KG: f64 = 70.0;

/// Last-resort burn rate (about 7 kcal/min)
pub const FALLBACK_KCAL_PER_SECOND: f64 = 0.12;

/// Which rule priced an exercise
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalorieBasis {
    PerSecond,
    PerMinute,
    Met,
    IntensityMet,
    Flat,
}

/// MET value for an intensity label
pub fn intensity_met(label: &str) -> Option<f64> {
    match label.trim().to_lowercase().as_str() {
        "low" => Some(3.0),
        "medium" => Some(6.0),
        "high" => Some(8.0),
        _ => None,
    }
}

/// Estimate calories for `seconds` of work on `exercise`.
///
/// The exercise's own intensity wins over the workout's.
pub fn estimate_exercise(
    exercise: &ExerciseDefinition,
    seconds: u32,
    workout_intensity: Option<&str>,
    weight_kg: Option<f64>,
) -> (f64, CalorieBasis) {
    let secs = f64::from(seconds);
    let hours = secs / 3600.0;
    let weight = weight_kg
        .filter(|w| w.is_finite() && *w > 0.0)
        .unwrap_or(ASSUMED_WEIGHT_KG);

    if let Some(rate) = exercise.calories_per_second {
        return (secs * rate, CalorieBasis::PerSecond);
    }
    if let Some(rate) = exercise.calories_per_minute {
        return (secs / 60.0 * rate, CalorieBasis::PerMinute);
    }
    if let Some(met) = exercise.met {
        return (met * weight * hours, CalorieBasis::Met);
    }

    let label = exercise
        .intensity
        .as_deref()
        .filter(|l| !l.trim().is_empty())
        .or(workout_intensity);
    if let Some(met) = label.and_then(intensity_met) {
        return (met * weight * hours, CalorieBasis::IntensityMet);
    }

    (secs * FALLBACK_KCAL_PER_SECOND, CalorieBasis::Flat)
}

/// Per-exercise line of a workout summary
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSummary {
    pub name: String,
    pub seconds: u32,
    pub calories: f64,
    pub basis: CalorieBasis,
}

/// Calories and completion figures for a finished session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSummary {
    pub exercises: Vec<ExerciseSummary>,
    /// Rounded sum of the exercise estimates
    pub total_calories: u32,
    pub total_seconds: u32,
    pub completion_percent: u32,
}

impl WorkoutSummary {
    pub fn from_record(record: &CompletionRecord, weight_kg: Option<f64>) -> Self {
        let intensity = record.workout_ref.intensity.as_deref();

        let exercises: Vec<ExerciseSummary> = record
            .exercises()
            .map(|(exercise, seconds)| {
                let (calories, basis) = estimate_exercise(exercise, seconds, intensity, weight_kg);
                ExerciseSummary {
                    name: exercise.name.clone(),
                    seconds,
                    calories,
                    basis,
                }
            })
            .collect();

        let total: f64 = exercises.iter().map(|e| e.calories).sum();
        let planned = record.planned_exercise_count.max(1) as f64;
        let completion = record.completed_exercises.len() as f64 / planned * 100.0;

        Self {
            exercises,
            total_calories: total.round().max(0.0) as u32,
            total_seconds: record.total_elapsed_seconds,
            completion_percent: completion.round() as u32,
        }
    }
}

/// `m:ss`-style display used by the session screen
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// `Xm Ys` display used by summaries
pub fn format_minutes(seconds: u32) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}
