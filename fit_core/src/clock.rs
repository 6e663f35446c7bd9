//! Interval clock for the work and break phases.
//!
//! One call to [`advance`] is one second of session time. The clock only
//! moves while the session is running in a clocked phase; the caller learns
//! on the same call when the phase has run out.

use crate::{Phase, SessionState};

/// Outcome of one clock tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockStep {
    /// Paused, or not in a clocked phase
    Idle,
    /// A second elapsed and time remains
    Ticked,
    /// This tick brought the phase to zero
    Exhausted,
}

/// Advance the active phase by one second
pub fn advance(state: &mut SessionState) -> ClockStep {
    if !state.is_running || !state.phase.is_clocked() {
        return ClockStep::Idle;
    }

    state.remaining_seconds = state.remaining_seconds.saturating_sub(1);
    state.total_elapsed_seconds = state.total_elapsed_seconds.saturating_add(1);

    if state.phase == Phase::Working {
        let worked = state
            .per_exercise_elapsed_seconds
            .entry(state.current_exercise_index)
            .or_insert(0);
        *worked = worked.saturating_add(1);
    }

    // Checked after the decrement so a phase of D seconds lasts D ticks
    if state.remaining_seconds == 0 {
        ClockStep::Exhausted
    } else {
        ClockStep::Ticked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn working(seconds: u32) -> SessionState {
        let mut state = SessionState::initial(seconds);
        state.phase = Phase::Working;
        state.is_running = true;
        state
    }

    #[test]
    fn test_work_tick_counts_exercise_time() {
        let mut state = working(5);

        assert_eq!(advance(&mut state), ClockStep::Ticked);
        assert_eq!(state.remaining_seconds, 4);
        assert_eq!(state.total_elapsed_seconds, 1);
        assert_eq!(state.elapsed_for(0), 1);
    }

    #[test]
    fn test_break_tick_skips_exercise_time() {
        let mut state = working(15);
        state.phase = Phase::OnBreak;

        advance(&mut state);

        assert_eq!(state.total_elapsed_seconds, 1);
        assert!(state.per_exercise_elapsed_seconds.is_empty());
    }

    #[test]
    fn test_exhausts_after_exactly_duration_ticks() {
        let mut state = working(3);

        assert_eq!(advance(&mut state), ClockStep::Ticked);
        assert_eq!(advance(&mut state), ClockStep::Ticked);
        assert_eq!(advance(&mut state), ClockStep::Exhausted);
        assert_eq!(state.remaining_seconds, 0);
        assert_eq!(state.elapsed_for(0), 3);
    }

    #[test]
    fn test_paused_clock_does_not_move() {
        let mut state = working(5);
        state.is_running = false;

        assert_eq!(advance(&mut state), ClockStep::Idle);
        assert_eq!(state.remaining_seconds, 5);
        assert_eq!(state.total_elapsed_seconds, 0);
    }

    #[test]
    fn test_countdown_phase_is_not_clocked() {
        let mut state = working(5);
        state.phase = Phase::Countdown;

        assert_eq!(advance(&mut state), ClockStep::Idle);
    }
}
