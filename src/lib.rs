//! solrset - lazy Solr queries over a key-value document store
//!
//! - `query`: clause builder, Solr compiler, single-execution query sets
//! - `write`: save pipeline with version history, activity log and batch barrier
//! - `store`: document store and search engine seams, in-memory backends
//! - `model`: the model contract the adapter consumes

pub mod config;
pub mod model;
pub mod observability;
pub mod query;
pub mod store;
pub mod write;

pub use config::{AdapterConfig, ConfigError};
pub use query::{ClauseValue, FilterClause, Modifier, QueryError, QueryResult, QuerySet};
pub use write::{ActingContext, Adapter, BatchSave, Buckets, SaveOutcome};
