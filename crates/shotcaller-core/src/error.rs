//! Core error types for shotcaller-core.
//!
//! The public API follows a degrade-over-fail policy: only an empty
//! technique pool blocks a session start. Narration failures are reported
//! through these types but never stop the timer.

use thiserror::Error;

/// Core error type for shotcaller-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Narration backend errors
    #[error("Narration error: {0}")]
    Narration(#[from] NarrationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session lifecycle errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Starting with no callable techniques is the only blocking failure.
    #[error("No techniques available for the selected categories")]
    EmptyPool,

    /// Command issued from a state that does not accept it
    #[error("Invalid state for '{command}': session is {state}")]
    InvalidState { command: String, state: String },

    /// A resume record that cannot produce a valid session
    #[error("Invalid resume record: {0}")]
    InvalidResume(String),
}

/// Narration-specific errors.
///
/// `Interrupted` is transient and is swallowed by the scheduler loop;
/// the other variants surface as `NarrationFailed` events but never stop
/// the timer.
#[derive(Error, Debug)]
pub enum NarrationError {
    /// No speech backend exists on this platform
    #[error("No speech backend available")]
    Unavailable,

    /// The in-flight utterance was cancelled (transient, expected on stop)
    #[error("Utterance interrupted")]
    Interrupted,

    /// The backend process or server rejected the request
    #[error("Speech backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },

    /// The narration queue was torn down while a request waited in it
    #[error("Narration engine is shut down")]
    Closed,

    /// IO error talking to a backend
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed {
        path: std::path::PathBuf,
        message: String,
    },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed {
        path: std::path::PathBuf,
        message: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<reqwest::Error> for NarrationError {
    fn from(err: reqwest::Error) -> Self {
        NarrationError::Backend {
            backend: "http".into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
