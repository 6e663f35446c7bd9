//! Pre-work countdown.
//!
//! Every work phase is preceded by a short "get ready" countdown. While it
//! runs the interval clock is stopped, and the tick that brings the
//! countdown to zero hands over to the work phase.

use crate::{Phase, SessionState};

/// Outcome of one countdown tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownStep {
    /// Not in a countdown; nothing changed
    Inactive,
    /// Still counting, with this many seconds left
    Pending(u32),
    /// Reached zero; the session is now Working with the clock running
    Finished,
}

/// Enter the countdown phase for the current exercise
pub fn begin(state: &mut SessionState, length: u32) {
    state.phase = Phase::Countdown;
    state.countdown_remaining = length;
    state.is_running = false;
}

/// Advance the countdown by one second
pub fn step(state: &mut SessionState) -> CountdownStep {
    if state.phase != Phase::Countdown {
        return CountdownStep::Inactive;
    }

    state.countdown_remaining = state.countdown_remaining.saturating_sub(1);
    if state.countdown_remaining > 0 {
        return CountdownStep::Pending(state.countdown_remaining);
    }

    state.phase = Phase::Working;
    state.is_running = true;
    CountdownStep::Finished
}
