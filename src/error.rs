use thiserror::Error;

/// Result alias used by every engine operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error taxonomy.
///
/// Validation failures surface before any write; store and serialization
/// failures wrap the backend error. Cascade propagation never returns these
/// to the triggering caller (failures are logged instead).
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("invalid files: {}", .0.join(", "))]
    InvalidFiles(Vec<String>),
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(why: impl Into<String>) -> Self {
        Self::Forbidden(why.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
