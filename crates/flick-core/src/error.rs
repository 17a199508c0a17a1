//! Error types for Flick.

use thiserror::Error;

/// Main error type for Flick operations.
#[derive(Error, Debug)]
pub enum FlickError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream does not carry a recognized signature. Non-fatal:
    /// the caller may hand the stream to another format handler.
    #[error("not a flick stream")]
    NotThisFormat,

    #[error("Format error: {0}")]
    Format(String),

    /// More frames appended than the header declared. Indicates a
    /// declared-vs-actual frame count mismatch in the stream.
    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    #[error("Render error: {0}")]
    Render(String),

    /// A blocking wait observed the shutdown latch. Normal early-return,
    /// not a failure.
    #[error("shutting down")]
    ShuttingDown,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Flick operations.
pub type Result<T> = std::result::Result<T, FlickError>;
