//! # Store Errors
//!
//! Error types for the document store and search engine seams.

use thiserror::Error;

/// Result type for document store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backend refused or failed the request
    #[error("Store backend failure in {bucket}: {message}")]
    Backend { bucket: String, message: String },

    /// Attempted to store an object that carries no data
    #[error("Object {0} has no data to store")]
    EmptyObject(String),

    /// Lock on an in-memory bucket was poisoned
    #[error("Bucket {0} is unavailable: lock poisoned")]
    Poisoned(String),
}

impl StoreError {
    /// Create a backend failure
    pub fn backend(bucket: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            bucket: bucket.into(),
            message: message.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Backend { .. } => "STORE_BACKEND_FAILED",
            StoreError::EmptyObject(_) => "STORE_EMPTY_OBJECT",
            StoreError::Poisoned(_) => "STORE_UNAVAILABLE",
        }
    }
}

/// Native failure reported by the search engine
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SearchError {
    message: String,
}

impl SearchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
