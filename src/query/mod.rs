//! Query layer
//!
//! Filter clauses are collected by a [`QuerySet`], compiled to a Solr query
//! string by [`QueryCompiler`], and run once against the search index. Hits
//! are materialized from the document store as `(document, key)` pairs.
//!
//! # Compilation
//!
//! ```text
//! filter("name", "john") + order_by(["-timestamp"])
//!   -> q = "name:john AND -deleted:True", sort = "timestamp desc"
//! ```
//!
//! Soft-deleted records are excluded unless a clause addresses `deleted`.

mod clause;
mod compiler;
mod errors;
mod escape;
mod facet;
mod params;
mod queryset;

pub use clause::{ClauseValue, FilterClause, Modifier};
pub use compiler::{
    QueryCompiler, DATE_FORMAT, DATE_TIME_FORMAT, DELETED_FIELD, EXCLUDE_DELETED, MATCH_ALL,
};
pub use errors::{QueryError, QueryResult};
pub use escape::escape_query;
pub use facet::FacetFetcher;
pub use params::{SortDirection, SortSpec, DEFAULT_SORT};
pub use queryset::{Hits, QuerySet, DISJUNCTION_KEY};
