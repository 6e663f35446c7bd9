#![forbid(unsafe_code)]

//! Core domain model and session engine for the Fit workout tracker.
//!
//! This crate provides:
//! - Domain types (workouts, exercises, session state)
//! - The guided workout session engine (countdown, interval clock,
//!   work/break state machine)
//! - Session snapshot persistence for resuming interrupted workouts
//! - Completion handoff, calorie estimation and the completed-workout log
//! - Workout catalog, history stats, configuration and logging

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod duration;
pub mod countdown;
pub mod clock;
pub mod ticker;
pub mod snapshot;
pub mod completion;
pub mod session;
pub mod catalog;
pub mod calories;
pub mod wal;
pub mod csv_rollup;
pub mod history;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use duration::{resolve_duration, resolve_duration_or};
pub use ticker::{Metronome, TickSlot};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, SessionSnapshot, SnapshotPort};
pub use completion::{CompletionRecord, CompletionSignal};
pub use session::{SessionEvent, WorkoutSession};
pub use catalog::{builtin_catalog, LayeredCatalog, WorkoutCatalog};
pub use calories::WorkoutSummary;
pub use wal::{CompletedWorkout, CompletionSink, JsonlSink};
pub use history::{load_recent_workouts, WorkoutStats};
