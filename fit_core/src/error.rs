//! Error types for the fit_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fit_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workout definition cannot be run (no exercises, unnamed exercise)
    #[error("Invalid workout definition: {0}")]
    InvalidDefinition(String),

    /// Workout lookup failed
    #[error("Workout not found: {0}")]
    WorkoutNotFound(String),

    /// A second tick source was armed while one was still outstanding.
    ///
    /// Transitions always cancel before re-arming, so reaching this is a bug.
    #[error("Duplicate tick source armed (generation {0})")]
    DuplicateTickSource(u64),

    /// The session hit an error mid-transition and refuses further mutation
    #[error("Session faulted: {0}")]
    SessionFaulted(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
