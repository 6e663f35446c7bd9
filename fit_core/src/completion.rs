//! Completion handoff.
//!
//! When the final work phase ends the session packages what was done into a
//! [`CompletionRecord`] and tells anyone listening on the
//! [`CompletionSignal`]. Calorie estimation and persistence belong to
//! whoever receives the record (see [`crate::calories`] and [`crate::wal`]).

use crate::{ExerciseDefinition, SessionState, WorkoutDefinition, WorkoutRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Final output of a finished session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletionRecord {
    pub id: Uuid,
    pub workout_ref: WorkoutRef,
    pub completed_exercises: Vec<ExerciseDefinition>,
    /// Worked seconds, one entry per completed exercise, same order
    pub per_exercise_elapsed_seconds: Vec<u32>,
    pub total_elapsed_seconds: u32,
    pub planned_exercise_count: usize,
    pub completed_at: DateTime<Utc>,
}

impl CompletionRecord {
    /// Build the record from the session's final state.
    ///
    /// Exercises complete in index order, so position `i` of
    /// `completed_exercises` is exercise index `i`.
    pub fn build(definition: &WorkoutDefinition, state: &SessionState) -> Self {
        let per_exercise_elapsed_seconds = (0..state.completed_exercises.len())
            .map(|index| state.elapsed_for(index))
            .collect();

        Self {
            id: Uuid::new_v4(),
            workout_ref: definition.workout_ref(),
            completed_exercises: state.completed_exercises.clone(),
            per_exercise_elapsed_seconds,
            total_elapsed_seconds: state.total_elapsed_seconds,
            planned_exercise_count: definition.exercises.len(),
            completed_at: Utc::now(),
        }
    }

    /// Completed exercises paired with their worked seconds
    pub fn exercises(&self) -> impl Iterator<Item = (&ExerciseDefinition, u32)> + '_ {
        self.completed_exercises
            .iter()
            .zip(self.per_exercise_elapsed_seconds.iter().copied())
    }
}

type Listener = Box<dyn FnMut(&WorkoutRef)>;

/// "Workout completed" broadcast for views that derive data from workouts.
///
/// Clones share one listener list. Listeners get the finished workout's
/// reference and nothing else.
#[derive(Clone, Default)]
pub struct CompletionSignal {
    listeners: Rc<RefCell<Vec<Listener>>>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: FnMut(&WorkoutRef) + 'static,
    {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Call every listener, in subscription order
    pub fn notify(&self, workout: &WorkoutRef) {
        // Listeners may subscribe while being notified
        let mut current = std::mem::take(&mut *self.listeners.borrow_mut());
        for listener in current.iter_mut() {
            listener(workout);
        }

        let mut slot = self.listeners.borrow_mut();
        current.append(&mut slot);
        *slot = current;
    }
}

impl fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Phase;

    fn workout() -> WorkoutDefinition {
        WorkoutDefinition {
            id: "w1".into(),
            name: "Legs".into(),
            intensity: Some("medium".into()),
            category: None,
            exercises: vec![
                ExerciseDefinition::timed("Squats", 5),
                ExerciseDefinition::timed("Lunges", 3),
            ],
        }
    }

    #[test]
    fn test_record_aligns_elapsed_with_exercises() {
        let def = workout();
        let mut state = SessionState::initial(5);
        state.phase = Phase::Completed;
        state.completed_exercises = def.exercises.clone();
        state.per_exercise_elapsed_seconds.insert(0, 5);
        // Exercise 1 was skipped immediately, so no entry
        state.total_elapsed_seconds = 20;

        let record = CompletionRecord::build(&def, &state);

        assert_eq!(record.per_exercise_elapsed_seconds, vec![5, 0]);
        assert_eq!(record.total_elapsed_seconds, 20);
        assert_eq!(record.planned_exercise_count, 2);
        assert_eq!(record.workout_ref.intensity.as_deref(), Some("medium"));

        let names: Vec<_> = record.exercises().map(|(ex, _)| ex.name.as_str()).collect();
        assert_eq!(names, vec!["Squats", "Lunges"]);
    }

    #[test]
    fn test_signal_reaches_every_listener() {
        let signal = CompletionSignal::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["dashboard", "notifications"] {
            let seen = Rc::clone(&seen);
            signal.subscribe(move |w: &WorkoutRef| seen.borrow_mut().push(format!("{}:{}", tag, w.id)));
        }

        signal.notify(&workout().workout_ref());

        assert_eq!(
            *seen.borrow(),
            vec!["dashboard:w1".to_string(), "notifications:w1".to_string()]
        );
    }

    #[test]
    fn test_subscribe_during_notify_is_kept() {
        let signal = CompletionSignal::new();
        let inner = signal.clone();
        signal.subscribe(move |_| inner.subscribe(|_| {}));

        signal.notify(&workout().workout_ref());

        assert_eq!(signal.listener_count(), 2);
    }
}
