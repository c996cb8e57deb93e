//! Error types for tonearm
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. No component retries on its own; callers decide.

use thiserror::Error;

/// Main error type for tonearm
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced song or playlist does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Playlist create collision
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Command serializer at capacity; retry later
    #[error("Server busy: {0}")]
    Busy(String),

    /// Playback device (mpv) call failed
    #[error("Device error: {0}")]
    Device(String),

    /// Rejected before any state mutation (empty name, bad position, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (playlist files, session snapshot, mpv IPC) errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the tonearm Error
pub type Result<T> = std::result::Result<T, Error>;
