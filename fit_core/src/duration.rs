//! Exercise duration resolution.
//!
//! Turns whatever the catalog put in an exercise's `duration` field into a
//! positive whole number of seconds.

use crate::{DurationHint, ExerciseDefinition, DEFAULT_EXERCISE_SECONDS};

/// Resolve an exercise's work duration, falling back to 180 seconds
pub fn resolve_duration(exercise: &ExerciseDefinition) -> u32 {
    resolve_duration_or(exercise, DEFAULT_EXERCISE_SECONDS)
}

/// Resolve an exercise's work duration with a caller-chosen fallback
///
/// Numbers and numeric strings are accepted when finite and positive.
/// Fractions round up so a positive value never resolves to zero.
pub fn resolve_duration_or(exercise: &ExerciseDefinition, default_seconds: u32) -> u32 {
    let seconds = match &exercise.duration {
        Some(DurationHint::Seconds(value)) => Some(*value),
        Some(DurationHint::Text(text)) => parse_numeric(text),
        Some(DurationHint::Other(_)) | None => None,
    };

    match seconds {
        Some(value) if value.is_finite() && value > 0.0 => {
            value.ceil().min(f64::from(u32::MAX)) as u32
        }
        _ => default_seconds.max(1),
    }
}

/// Blank strings count as missing rather than zero
fn parse_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_duration(duration: Option<DurationHint>) -> ExerciseDefinition {
        ExerciseDefinition {
            name: "Squats".into(),
            duration,
            ..ExerciseDefinition::default()
        }
    }

    #[test]
    fn test_configured_duration_is_used() {
        let ex = with_duration(Some(DurationHint::Seconds(45.0)));
        assert_eq!(resolve_duration(&ex), 45);
    }

    #[test]
    fn test_missing_duration_uses_default() {
        assert_eq!(resolve_duration(&with_duration(None)), 180);
    }

    #[test]
    fn test_non_positive_duration_uses_default() {
        assert_eq!(resolve_duration(&with_duration(Some(DurationHint::Seconds(0.0)))), 180);
        assert_eq!(resolve_duration(&with_duration(Some(DurationHint::Seconds(-10.0)))), 180);
        assert_eq!(
            resolve_duration(&with_duration(Some(DurationHint::Seconds(f64::NAN)))),
            180
        );
    }

    #[test]
    fn test_numeric_strings_parse() {
        let ex = with_duration(Some(DurationHint::Text(" 60 ".into())));
        assert_eq!(resolve_duration(&ex), 60);
    }

    #[test]
    fn test_garbage_strings_use_default() {
        assert_eq!(resolve_duration(&with_duration(Some(DurationHint::Text("abc".into())))), 180);
        assert_eq!(resolve_duration(&with_duration(Some(DurationHint::Text("".into())))), 180);
        assert_eq!(
            resolve_duration(&with_duration(Some(DurationHint::Other(serde_json::Value::Bool(true))))),
            180
        );
    }

    #[test]
    fn test_fractions_round_up() {
        assert_eq!(resolve_duration(&with_duration(Some(DurationHint::Seconds(0.4)))), 1);
        assert_eq!(resolve_duration(&with_duration(Some(DurationHint::Seconds(29.5)))), 30);
    }

    #[test]
    fn test_custom_default() {
        assert_eq!(resolve_duration_or(&with_duration(None), 90), 90);
    }
}
