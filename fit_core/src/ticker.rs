//! Tick source bookkeeping.
//!
//! The session owns a single [`TickSlot`]: the handle of the one scheduled
//! one-second callback that may be outstanding. Every phase change cancels
//! the old arm before taking a new one, and each arm gets a fresh
//! generation number.
//!
//! The host turns that handle into wall-clock time with a [`Metronome`],
//! which restarts its deadline whenever the generation changes and goes
//! quiet when the slot is cancelled.

use crate::{Error, Result};
use std::time::{Duration, Instant};

/// The session's single scheduled-callback handle
#[derive(Debug, Default)]
pub struct TickSlot {
    generation: u64,
    armed: bool,
}

impl TickSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot. Fails if a callback is already outstanding.
    pub fn arm(&mut self) -> Result<u64> {
        if self.armed {
            return Err(Error::DuplicateTickSource(self.generation));
        }
        self.generation += 1;
        self.armed = true;
        Ok(self.generation)
    }

    /// Cancel whatever is outstanding, then arm
    pub fn rearm(&mut self) -> Result<u64> {
        self.cancel();
        self.arm()
    }

    /// Cancel the outstanding callback. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        std::mem::replace(&mut self.armed, false)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Generation of the current arm, if any
    pub fn active_generation(&self) -> Option<u64> {
        self.armed.then_some(self.generation)
    }
}

/// Host-side wall-clock pacer with one outstanding deadline.
#[derive(Debug)]
pub struct Metronome {
    period: Duration,
    next: Option<Instant>,
    following: Option<u64>,
}

impl Metronome {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: None,
            following: None,
        }
    }

    /// Track the session's tick slot.
    ///
    /// A new generation restarts the deadline a full period from `now`;
    /// `None` stops the metronome.
    pub fn follow(&mut self, generation: Option<u64>, now: Instant) {
        if generation == self.following {
            return;
        }
        self.following = generation;
        self.next = generation.map(|_| now + self.period);
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// How long until the next tick is due
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next.map(|next| next.saturating_duration_since(now))
    }

    /// Number of whole periods that have come due by `now`
    ///
    /// With a zero period every call yields exactly one tick.
    pub fn take_due(&mut self, now: Instant) -> u32 {
        let Some(next) = self.next else {
            return 0;
        };

        if self.period.is_zero() {
            return 1;
        }

        if now < next {
            return 0;
        }

        let behind = now.duration_since(next);
        let extra = (behind.as_nanos() / self.period.as_nanos()) as u32;
        let count = extra.saturating_add(1);
        self.next = Some(next + self.period * count);
        count
    }
}
