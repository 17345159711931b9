//! Error types shared across the crate.
//!
//! Each concern owns a focused `thiserror` enum; `BreatheError` collects them
//! for callers that only need a single error type.

use thiserror::Error;

use crate::chat::ChatError;

/// Convenience alias used by the session controller and database layer.
pub type BreatheResult<T> = Result<T, BreatheError>;

/// Input rejected at the profile-edit or journal boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be strictly positive
    #[error("'{field}' must be greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    /// Numeric field must not be negative
    #[error("'{field}' must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },

    /// Value outside of an inclusive range
    #[error("'{field}' must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    /// Non-finite floating point input (NaN or infinity)
    #[error("'{field}' must be a finite number")]
    NotFinite { field: &'static str },
}

/// Crate-level error type.
#[derive(Error, Debug)]
pub enum BreatheError {
    /// Invalid habit profile or journal input
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// SQLite failure in the local store
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error when reading or writing files
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded or stored
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat request or stream failure
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    /// Profile store collaborator failure
    #[error("Store error in {context}: {message}")]
    Store { context: String, message: String },

    /// No signed-in user for an operation that needs one
    #[error("No profile loaded for user '{user_id}'")]
    NoProfile { user_id: String },

    /// Anything else, carried with its context chain
    #[error(transparent)]
    General(#[from] anyhow::Error),
}

impl BreatheError {
    /// Create a store error with context
    pub fn store(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the failure comes from a remote collaborator and may succeed later
    pub fn is_transient(&self) -> bool {
        match self {
            BreatheError::Store { .. } => true,
            BreatheError::Chat(chat) => chat.is_transient(),
            _ => false,
        }
    }
}
