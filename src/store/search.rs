//! Search engine seam
//!
//! The search index is external. Queries reach it as a compiled Solr string,
//! an index name, and a parameter map; it answers with the matching row keys
//! and the total match count.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::SearchError;

/// Row key field the search index stores for every document
pub const ROW_KEY_FIELD: &str = "_yz_rk";

/// Engine-level search parameters (`rows`, `start`, `sort`, `fl`, ...)
///
/// Kept ordered so that debug output and engine requests are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParameters(BTreeMap<String, Value>);

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Merge every entry of `other` over this map
    pub fn merge<I, K>(&mut self, other: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (name, value) in other {
            self.0.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of rows requested, if set
    pub fn rows(&self) -> Option<u64> {
        self.0.get("rows").and_then(Value::as_u64)
    }

    /// Sort specification, if set
    pub fn sort(&self) -> Option<&str> {
        self.0.get("sort").and_then(Value::as_str)
    }

    /// Inject the default row count unless one was given
    pub fn ensure_rows(&mut self, default_rows: u64) {
        self.0
            .entry("rows".to_string())
            .or_insert_with(|| Value::from(default_rows));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}

/// A single search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDoc {
    /// Key of the backing record in the document store
    #[serde(rename = "_yz_rk")]
    pub row_key: String,
    /// Any other stored fields the engine returned
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SearchDoc {
    pub fn new(row_key: impl Into<String>) -> Self {
        Self {
            row_key: row_key.into(),
            fields: Map::new(),
        }
    }
}

/// Raw search engine response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub docs: Vec<SearchDoc>,
    /// Total match count, independent of `rows`
    #[serde(default)]
    pub num_found: Option<u64>,
}

impl SearchResponse {
    pub fn new(docs: Vec<SearchDoc>, num_found: u64) -> Self {
        Self {
            docs,
            num_found: Some(num_found),
        }
    }

    /// A response whose hits are exactly the given keys
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let docs: Vec<SearchDoc> = keys.into_iter().map(SearchDoc::new).collect();
        let found = docs.len() as u64;
        Self::new(docs, found)
    }
}

/// Trait for running compiled queries against the search index
pub trait SearchEngine: Send + Sync {
    /// Run `query` against `index` with the given parameters
    fn search(
        &self,
        query: &str,
        index: &str,
        params: &QueryParameters,
    ) -> Result<SearchResponse, SearchError>;
}
