//! Error types for the docsync crate.

use thiserror::Error;

/// Errors that can occur during transform operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Invalid transform configuration, fatal at construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// A log entry that cannot be turned into a typed mutation event.
    ///
    /// Reported and dropped by the caller, never retried by the core.
    #[error("malformed {operation} entry: {reason}")]
    MalformedEvent { operation: String, reason: String },

    /// A log entry carrying an unknown operation code.
    #[error("invalid mutation operation: {0}")]
    InvalidOperation(String),

    /// A custom projection function failed.
    ///
    /// The failure is propagated to the caller unmodified; the core does not
    /// sandbox or retry projection functions.
    #[error("projection function failed: {0}")]
    Projection(String),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type for transform operations.
pub type SyncResult<T> = Result<T, SyncError>;
