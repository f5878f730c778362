//! Error types for role resolution and object filtering

use thiserror::Error;

/// Authorization errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Invalid input (blank role name, inaccessible object handle, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Role record store failure
    #[error("Role store error: {0}")]
    Store(String),

    /// Durable cache unreachable
    #[error("Cache error: {0}")]
    Cache(String),

    /// Authorization oracle failure
    #[error("Authorization oracle error: {0}")]
    Oracle(String),

    /// Fatal configuration problem
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Field access on a filterable object failed
    #[error("Field error on '{subject}.{field}': {reason}")]
    Field {
        subject: String,
        field: String,
        reason: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
