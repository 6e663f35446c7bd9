//! Guided workout session engine.
//!
//! The session walks an ordered exercise list through
//!
//! ```text
//! NotStarted -> Countdown -> Working -> (OnBreak -> Countdown -> Working)* -> Completed
//! ```
//!
//! It has no thread or timer of its own. The host calls [`WorkoutSession::tick`]
//! once per second while [`WorkoutSession::tick_generation`] reports an armed
//! tick source, and forwards user commands (start, pause, resume, skip,
//! quit). Every mutation is mirrored to the snapshot store; completion hands a
//! [`CompletionRecord`] back exactly once.

use crate::clock::{self, ClockStep};
use crate::completion::{CompletionRecord, CompletionSignal};
use crate::countdown::{self, CountdownStep};
use crate::duration::resolve_duration_or;
use crate::snapshot::{self, SessionSnapshot, SnapshotPort};
use crate::ticker::TickSlot;
use crate::{
    Error, ExerciseDefinition, Phase, Result, SessionState, SessionTimings, WorkoutDefinition,
    WorkoutRef,
};

/// Phase transitions reported back to the host
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// "Get ready" for the exercise at `index`
    CountdownStarted { index: usize },
    /// Work clock started for the exercise at `index`
    WorkStarted { index: usize },
    /// Exercise `finished` is done; resting before `next`
    BreakStarted { finished: usize, next: usize },
    /// Final exercise done
    Completed(CompletionRecord),
}

/// Whether an operation touched session state
enum Outcome {
    Unchanged,
    Changed(Option<SessionEvent>),
}

/// A single guided workout session
pub struct WorkoutSession<S: SnapshotPort> {
    definition: WorkoutDefinition,
    timings: SessionTimings,
    state: SessionState,
    store: S,
    ticker: TickSlot,
    signal: CompletionSignal,
    fault: Option<String>,
}

impl<S: SnapshotPort> WorkoutSession<S> {
    /// Create a fresh session.
    ///
    /// Fails with [`Error::InvalidDefinition`] for a workout without
    /// exercises or with an unnamed exercise. Nothing is written to the
    /// store until the session is mutated, so an older snapshot stays
    /// available until the user decides what to do with it.
    pub fn new(definition: WorkoutDefinition, timings: SessionTimings, store: S) -> Result<Self> {
        definition.validate()?;
        timings.validate()?;

        let first = resolve_duration_or(&definition.exercises[0], timings.default_exercise_seconds);

        tracing::debug!(
            "Created session for workout '{}' ({} exercises)",
            definition.id,
            definition.exercises.len()
        );

        Ok(Self {
            definition,
            timings,
            state: SessionState::initial(first),
            store,
            ticker: TickSlot::new(),
            signal: CompletionSignal::new(),
            fault: None,
        })
    }

    /// Create a session, picking up the stored snapshot for this workout if
    /// there is a usable one.
    ///
    /// A missing, malformed or mismatched snapshot gives the same session as
    /// [`WorkoutSession::new`].
    pub fn restore(definition: WorkoutDefinition, timings: SessionTimings, store: S) -> Result<Self> {
        let mut session = Self::new(definition, timings, store)?;

        let Some(pending) = snapshot::pending_for(&session.store, &session.definition, &session.timings)
        else {
            tracing::info!("No resumable snapshot, starting '{}' fresh", session.definition.id);
            return Ok(session);
        };

        tracing::info!(
            "Resuming '{}' at exercise {} ({:?}, saved {})",
            session.definition.id,
            pending.current_exercise_index + 1,
            pending.phase,
            pending.timestamp
        );

        session.state = pending.into_state();
        if session.state.phase.is_live() {
            session.ticker.arm()?;
        }

        Ok(session)
    }

    /// Share a completion signal with other parts of the application
    pub fn with_signal(mut self, signal: CompletionSignal) -> Self {
        self.signal = signal;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn definition(&self) -> &WorkoutDefinition {
        &self.definition
    }

    pub fn workout_ref(&self) -> WorkoutRef {
        self.definition.workout_ref()
    }

    pub fn timings(&self) -> &SessionTimings {
        &self.timings
    }

    pub fn current_exercise(&self) -> Option<&ExerciseDefinition> {
        match self.state.phase {
            Phase::Completed => None,
            _ => self.definition.exercises.get(self.state.current_exercise_index),
        }
    }

    /// Exercise following the current one, if any
    pub fn next_exercise(&self) -> Option<&ExerciseDefinition> {
        match self.state.phase {
            Phase::Completed => None,
            _ => self
                .definition
                .exercises
                .get(self.state.current_exercise_index + 1),
        }
    }

    /// Work length of the exercise at `index`
    pub fn duration_of(&self, index: usize) -> Option<u32> {
        self.definition
            .exercises
            .get(index)
            .map(|ex| resolve_duration_or(ex, self.timings.default_exercise_seconds))
    }

    /// True while a session is under way and leaving would lose progress
    pub fn is_active(&self) -> bool {
        self.fault.is_none() && self.state.phase.is_live()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    /// Generation of the outstanding tick source; `None` when no ticks are
    /// wanted. Changes on every phase entry.
    pub fn tick_generation(&self) -> Option<u64> {
        self.ticker.active_generation()
    }

    pub fn on_complete<F>(&self, listener: F)
    where
        F: FnMut(&WorkoutRef) + 'static,
    {
        self.signal.subscribe(listener);
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin the first countdown. Only valid before the session starts.
    pub fn start(&mut self) -> Result<Option<SessionEvent>> {
        self.ensure_healthy()?;
        if self.state.phase != Phase::NotStarted {
            return Ok(None);
        }

        tracing::info!("Starting workout '{}'", self.definition.id);
        self.transition(|s| s.enter_countdown().map(Outcome::Changed))
    }

    /// Process one second of wall-clock time
    pub fn tick(&mut self) -> Result<Option<SessionEvent>> {
        self.ensure_healthy()?;
        if !self.ticker.is_armed() {
            return Ok(None);
        }

        self.transition(|s| match s.state.phase {
            Phase::Countdown => match countdown::step(&mut s.state) {
                CountdownStep::Finished => {
                    s.ticker.rearm()?;
                    tracing::debug!("Work started on exercise {}", s.state.current_exercise_index);
                    Ok(Outcome::Changed(Some(SessionEvent::WorkStarted {
                        index: s.state.current_exercise_index,
                    })))
                }
                CountdownStep::Pending(_) => Ok(Outcome::Changed(None)),
                CountdownStep::Inactive => Ok(Outcome::Unchanged),
            },
            Phase::Working | Phase::OnBreak => match clock::advance(&mut s.state) {
                ClockStep::Exhausted => s.exhaust().map(Outcome::Changed),
                ClockStep::Ticked => Ok(Outcome::Changed(None)),
                ClockStep::Idle => Ok(Outcome::Unchanged),
            },
            Phase::NotStarted | Phase::Completed => Ok(Outcome::Unchanged),
        })
    }

    /// End the current work or break phase now, exactly as if its time had
    /// run out. Ignored outside Working and OnBreak.
    pub fn skip(&mut self) -> Result<Option<SessionEvent>> {
        self.ensure_healthy()?;
        if !self.state.phase.is_clocked() {
            return Ok(None);
        }

        tracing::debug!(
            "Skipping {:?} of exercise {}",
            self.state.phase,
            self.state.current_exercise_index
        );
        self.transition(|s| s.exhaust().map(Outcome::Changed))
    }

    /// Stop the clock. Returns whether anything changed.
    pub fn pause(&mut self) -> Result<bool> {
        self.set_running(false)
    }

    /// Restart a paused clock. Returns whether anything changed.
    pub fn resume(&mut self) -> Result<bool> {
        self.set_running(true)
    }

    pub fn toggle_pause(&mut self) -> Result<bool> {
        let target = !self.state.is_running;
        self.set_running(target)
    }

    /// Abandon the session: cancel the tick source and clear the snapshot.
    ///
    /// No completion record is produced. Confirming with the user is the
    /// caller's job.
    pub fn quit(mut self) -> Result<()> {
        self.ticker.cancel();
        snapshot::discard(&mut self.store)?;
        tracing::info!(
            "Quit workout '{}' at exercise {} ({:?})",
            self.definition.id,
            self.state.current_exercise_index + 1,
            self.state.phase
        );
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_healthy(&self) -> Result<()> {
        match &self.fault {
            Some(reason) => Err(Error::SessionFaulted(reason.clone())),
            None => Ok(()),
        }
    }

    /// Run a state change. Errors fault the session; successes are
    /// persisted.
    fn transition<F>(&mut self, change: F) -> Result<Option<SessionEvent>>
    where
        F: FnOnce(&mut Self) -> Result<Outcome>,
    {
        match change(self) {
            Ok(Outcome::Unchanged) => Ok(None),
            Ok(Outcome::Changed(event)) => {
                self.persist();
                Ok(event)
            }
            Err(e) => {
                self.ticker.cancel();
                self.state.is_running = false;
                self.fault = Some(e.to_string());
                tracing::error!(
                    "Workout '{}' faulted in {:?}: {}",
                    self.definition.id,
                    self.state.phase,
                    e
                );
                Err(e)
            }
        }
    }

    fn set_running(&mut self, running: bool) -> Result<bool> {
        self.ensure_healthy()?;
        if !self.state.phase.is_clocked() || self.state.is_running == running {
            return Ok(false);
        }

        self.transition(|s| {
            s.state.is_running = running;
            tracing::debug!("Clock {}", if running { "resumed" } else { "paused" });
            Ok(Outcome::Changed(None))
        })?;
        Ok(true)
    }

    fn enter_countdown(&mut self) -> Result<Option<SessionEvent>> {
        countdown::begin(&mut self.state, self.timings.countdown_seconds);
        self.ticker.rearm()?;
        Ok(Some(SessionEvent::CountdownStarted {
            index: self.state.current_exercise_index,
        }))
    }

    /// Current work or break phase has run out
    fn exhaust(&mut self) -> Result<Option<SessionEvent>> {
        let index = self.state.current_exercise_index;

        match self.state.phase {
            Phase::Working => {
                let exercise = self.exercise_at(index)?.clone();
                self.state.completed_exercises.push(exercise);

                if index + 1 >= self.definition.exercises.len() {
                    return self.complete().map(Some);
                }

                self.state.phase = Phase::OnBreak;
                self.state.remaining_seconds = self.timings.break_seconds;
                self.state.is_running = true;
                self.ticker.rearm()?;

                tracing::debug!("Exercise {} done, break before {}", index, index + 1);
                Ok(Some(SessionEvent::BreakStarted {
                    finished: index,
                    next: index + 1,
                }))
            }
            Phase::OnBreak => {
                let next = index + 1;
                let seconds =
                    resolve_duration_or(self.exercise_at(next)?, self.timings.default_exercise_seconds);

                self.state.current_exercise_index = next;
                self.state.remaining_seconds = seconds;
                self.enter_countdown()
            }
            _ => Ok(None),
        }
    }

    fn exercise_at(&self, index: usize) -> Result<&ExerciseDefinition> {
        self.definition.exercises.get(index).ok_or_else(|| {
            Error::Other(format!(
                "exercise index {} out of range for workout '{}'",
                index, self.definition.id
            ))
        })
    }

    fn complete(&mut self) -> Result<SessionEvent> {
        self.ticker.cancel();
        self.state.phase = Phase::Completed;
        self.state.is_running = false;
        self.state.remaining_seconds = 0;
        self.state.countdown_remaining = 0;

        let record = CompletionRecord::build(&self.definition, &self.state);

        if let Err(e) = snapshot::discard(&mut self.store) {
            tracing::warn!("Failed to clear session snapshot: {}", e);
        }

        tracing::info!(
            "Completed workout '{}': {} exercises in {}s",
            self.definition.id,
            record.completed_exercises.len(),
            record.total_elapsed_seconds
        );

        self.signal.notify(&record.workout_ref);
        Ok(SessionEvent::Completed(record))
    }

    fn persist(&mut self) {
        // Completion clears the slot rather than writing it
        if self.state.phase == Phase::Completed {
            return;
        }

        let snapshot = SessionSnapshot::capture(&self.definition.id, &self.state);
        if let Err(e) = snapshot::write(&mut self.store, &snapshot) {
            tracing::warn!("Failed to save session snapshot: {}", e);
        }
    }
}
