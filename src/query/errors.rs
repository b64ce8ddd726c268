//! # Query Errors
//!
//! Error codes:
//! - QUERY_LOCKED: structural change after execution
//! - QUERY_NOT_FOUND: no record matched, or the key does not exist
//! - QUERY_INDEX_LAG: the index returned a key the store does not have yet
//! - QUERY_MULTIPLE_RESULTS: more than one match where one was required
//! - QUERY_ENGINE_FAILED: the search engine rejected the query
//! - QUERY_BATCH_TIMEOUT: a bounded batch wait ran out of polls
//!
//! None of these are retried locally.

use thiserror::Error;

use crate::model::ModelError;
use crate::store::StoreError;

/// Result type for query and write operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors surfaced by the query layer and the write pipeline
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// Structural change attempted after the query was compiled or executed
    #[error("Query already executed, no changes can be made: {query}")]
    Locked { query: String },

    /// Nothing matched, or a direct key read found no record
    #[error("No record found in {bucket} for {query}")]
    NotFound { bucket: String, query: String },

    /// The search index reported a key the document store does not hold
    #[error("Record {key} found in index {bucket} but not in the store; possibly a store/index sync delay")]
    IndexLag { bucket: String, key: String },

    /// More than one match where exactly one was required
    #[error("{count} objects returned for {model}")]
    MultipleResults { count: i64, model: String },

    /// Search engine failure, annotated with the request that caused it
    #[error("Search failed: {message} [query: {query}, bucket: {bucket}, params: {params}]")]
    Engine {
        message: String,
        query: String,
        bucket: String,
        params: String,
    },

    /// The batch barrier gave up waiting for the index
    #[error("Index {bucket} still missing {missing} of {pending} batch keys after {attempts} polls")]
    BatchTimeout {
        bucket: String,
        pending: usize,
        missing: usize,
        attempts: u32,
    },

    /// The faceting endpoint returned something unusable
    #[error("Facet request failed: {0}")]
    Facet(String),

    /// A version or activity record could not be encoded
    #[error("Failed to encode record: {0}")]
    Encode(String),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Model(#[from] ModelError),
}

impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        QueryError::Encode(e.to_string())
    }
}

impl QueryError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Locked { .. } => "QUERY_LOCKED",
            QueryError::NotFound { .. } => "QUERY_NOT_FOUND",
            QueryError::IndexLag { .. } => "QUERY_INDEX_LAG",
            QueryError::MultipleResults { .. } => "QUERY_MULTIPLE_RESULTS",
            QueryError::Engine { .. } => "QUERY_ENGINE_FAILED",
            QueryError::BatchTimeout { .. } => "QUERY_BATCH_TIMEOUT",
            QueryError::Facet(_) => "QUERY_FACET_FAILED",
            QueryError::Encode(_) => "QUERY_ENCODE_FAILED",
            QueryError::Store(e) => e.code(),
            QueryError::Model(e) => e.code(),
        }
    }

    /// True for both "never existed" and "not in the store yet"
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::NotFound { .. } | QueryError::IndexLag { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_family() {
        let never = QueryError::NotFound {
            bucket: "models_person".into(),
            query: "name:john".into(),
        };
        let lag = QueryError::IndexLag {
            bucket: "models_person".into(),
            key: "k1".into(),
        };
        assert!(never.is_not_found());
        assert!(lag.is_not_found());
        assert_ne!(never.code(), lag.code());
    }

    #[test]
    fn test_engine_error_carries_context() {
        let err = QueryError::Engine {
            message: "undefined field".into(),
            query: "foo:bar".into(),
            bucket: "models_person".into(),
            params: "{rows: 10}".into(),
        };
        let display = err.to_string();
        assert!(display.contains("foo:bar"));
        assert!(display.contains("models_person"));
        assert!(display.contains("rows: 10"));
    }

    #[test]
    fn test_store_error_code_passes_through() {
        let err: QueryError = StoreError::backend("b", "down").into();
        assert_eq!(err.code(), "STORE_BACKEND_FAILED");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_multiple_results_display() {
        let err = QueryError::MultipleResults {
            count: 3,
            model: "Person".into(),
        };
        assert_eq!(err.to_string(), "3 objects returned for Person");
    }
}
