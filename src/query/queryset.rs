//! Lazy query over one bucket
//!
//! A `QuerySet` collects clauses and parameters without touching the network.
//! The first operation that needs results compiles the clauses, runs exactly
//! one search, and caches the response; from then on the query is locked.
//!
//! ```ignore
//! let mut people = adapter.query();
//! people.filter("name", "john")?.order_by(["-timestamp"])?;
//! for hit in people.iter()? {
//!     let (document, key) = hit?;
//! }
//! ```
//!
//! # Locking
//!
//! - Compiling (explicitly, or through `count`/`execute`) freezes the clause list
//! - Executing additionally freezes ordering and parameters
//!
//! Cloning gives an unlocked copy with the same clauses and parameters.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use serde_json::Value;

use crate::config::AdapterConfig;
use crate::model::FieldMap;
use crate::observability::{
    log_event_with_fields, Event, NoopSink, ObservabilitySink, ObservationScope,
};
use crate::store::{DocumentStore, QueryParameters, SearchDoc, SearchEngine, SearchResponse, StoredObject};

use super::clause::{ClauseValue, FilterClause, Modifier};
use super::compiler::QueryCompiler;
use super::errors::{QueryError, QueryResult};
use super::facet::{facet_url, parse_facet_counts, FacetFetcher};
use super::params::{default_params, sort_param};

/// Key of the clause `search_on` produces; the compiler ignores it
pub const DISJUNCTION_KEY: &str = "__or__";

/// Lazy, single-execution query over one bucket's index
pub struct QuerySet {
    store: Arc<dyn DocumentStore>,
    engine: Arc<dyn SearchEngine>,
    config: Arc<AdapterConfig>,
    fields: Arc<FieldMap>,
    model_name: String,
    sink: Arc<dyn ObservabilitySink>,

    clauses: Vec<FilterClause>,
    params: QueryParameters,
    compiled: Option<String>,
    locked: bool,
    search_cache: Option<SearchResponse>,
    /// Total from a zero-row count search that did not execute the query
    count_cache: Option<i64>,
    /// Fetched record of the first hit (or of a direct key read)
    record_cache: Option<StoredObject>,
}

impl QuerySet {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        engine: Arc<dyn SearchEngine>,
        config: Arc<AdapterConfig>,
    ) -> Self {
        let model_name = config.bucket_name.clone();
        Self {
            store,
            engine,
            config,
            fields: Arc::new(FieldMap::default()),
            model_name,
            sink: Arc::new(NoopSink),
            clauses: Vec::new(),
            params: default_params(),
            compiled: None,
            locked: false,
            search_cache: None,
            count_cache: None,
            record_cache: None,
        }
    }

    /// Declared fields, consulted for date formatting
    pub fn with_fields(mut self, fields: Arc<FieldMap>) -> Self {
        self.fields = fields;
        self
    }

    /// Name reported in multiple-results errors
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Search index name
    pub fn index_name(&self) -> String {
        self.config.index_name()
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn params(&self) -> &QueryParameters {
        &self.params
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Compiled string, if compiled
    pub fn compiled_query(&self) -> Option<&str> {
        self.compiled.as_deref()
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    fn locked_error(&self) -> QueryError {
        QueryError::Locked {
            query: self.debug_data(),
        }
    }

    fn ensure_open(&self) -> QueryResult<()> {
        if self.locked || self.compiled.is_some() {
            return Err(self.locked_error());
        }
        Ok(())
    }

    /// Add `key = value`; the value is escaped at compile time
    pub fn filter(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ClauseValue>,
    ) -> QueryResult<&mut Self> {
        self.add_filter([FilterClause::new(key, value)])
    }

    /// Add a clause whose value is already escaped
    pub fn filter_escaped(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ClauseValue>,
    ) -> QueryResult<&mut Self> {
        self.add_filter([FilterClause::escaped(key, value)])
    }

    /// Append clauses in order
    pub fn add_filter<I, C>(&mut self, clauses: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<FilterClause>,
    {
        self.ensure_open()?;
        self.clauses.extend(clauses.into_iter().map(Into::into));
        Ok(self)
    }

    /// Match `value` against any of `fields`, with one modifier.
    ///
    /// `search_on(&["name", "surname"], Modifier::Contains, "jo")` gives
    /// `(name:*jo* OR surname:*jo*)`.
    pub fn search_on(
        &mut self,
        fields: &[&str],
        modifier: Modifier,
        value: impl Into<ClauseValue>,
    ) -> QueryResult<&mut Self> {
        let value = value.into();
        let pairs = fields
            .iter()
            .map(|field| (format!("{}__{}", field, modifier), value.clone()))
            .collect();
        self.add_filter([FilterClause::new(
            DISJUNCTION_KEY,
            ClauseValue::Disjunction(pairs),
        )])
    }

    /// Sort by `fields`; a leading `-` sorts descending
    pub fn order_by<I, S>(&mut self, fields: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.locked {
            return Err(self.locked_error());
        }
        self.params.set("sort", sort_param(fields));
        Ok(self)
    }

    /// Merge engine parameters (`rows`, `start`, `fl`, ...)
    pub fn set_params<I, K>(&mut self, options: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        if self.locked {
            return Err(self.locked_error());
        }
        self.params.merge(options);
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Compiling and executing
    // ------------------------------------------------------------------

    /// Compile the clauses once; later calls return the same string
    pub fn compile(&mut self) -> &str {
        if self.compiled.is_none() {
            let query = QueryCompiler::new(&self.fields).compile(&self.clauses);
            if self.config.traces_queries() {
                log_event_with_fields(
                    Event::QueryCompiled,
                    &[("index", self.index_name().as_str()), ("query", query.as_str())],
                );
            }
            self.compiled = Some(query);
        }
        self.compiled.as_deref().unwrap_or_default()
    }

    fn run_search(&mut self, params: &QueryParameters) -> QueryResult<SearchResponse> {
        let query = self.compile().to_string();
        let index = self.index_name();

        self.engine
            .search(&query, &index, params)
            .map_err(|e| {
                log_event_with_fields(
                    Event::SearchFailed,
                    &[
                        ("index", index.as_str()),
                        ("query", query.as_str()),
                        ("reason", e.message()),
                    ],
                );
                QueryError::Engine {
                    message: e.message().to_string(),
                    query: query.clone(),
                    bucket: index.clone(),
                    params: params.to_string(),
                }
            })
    }

    /// Run the search once and cache the response. No-op when locked.
    pub fn execute(&mut self) -> QueryResult<()> {
        if self.locked {
            return Ok(());
        }

        self.params.ensure_rows(self.config.row_size);
        let params = self.params.clone();
        let response = self.run_search(&params)?;

        if self.config.debug {
            let query = self.compiled.as_deref().unwrap_or_default();
            self.sink.record_search(&self.index_name(), query);
            log_event_with_fields(
                Event::QueryExecuted,
                &[
                    ("hits", response.docs.len().to_string().as_str()),
                    ("index", self.index_name().as_str()),
                    ("query", query),
                ],
            );
        }

        self.search_cache = Some(response);
        self.locked = true;
        Ok(())
    }

    /// Total number of matches, `-1` if the engine does not report one.
    ///
    /// Without cached results this runs one zero-row search and leaves the
    /// query itself unexecuted.
    pub fn count(&mut self) -> QueryResult<i64> {
        if let Some(response) = &self.search_cache {
            return Ok(num_found(response));
        }
        if let Some(count) = self.count_cache {
            return Ok(count);
        }

        let mut params = self.params.clone();
        params.set("rows", 0);
        let response = self.run_search(&params)?;
        if self.config.debug {
            let query = self.compiled.as_deref().unwrap_or_default();
            self.sink.record_count(&self.index_name(), query);
        }

        let count = num_found(&response);
        self.count_cache = Some(count);
        Ok(count)
    }

    fn fetch(&self, key: &str) -> QueryResult<StoredObject> {
        let object = self.store.get(key)?;
        if self.config.debug {
            self.sink.record_read(self.store.name(), key);
        }
        Ok(object)
    }

    /// Exactly one record.
    ///
    /// With a key, reads the store directly without searching. Without one,
    /// executes the query and requires a single match.
    pub fn get(&mut self, key: Option<&str>) -> QueryResult<(Value, String)> {
        match key {
            Some(key) => {
                let object = self.fetch(key)?;
                if !object.exists() {
                    return Err(QueryError::NotFound {
                        bucket: self.index_name(),
                        query: key.to_string(),
                    });
                }
                self.search_cache = Some(SearchResponse::from_keys([key]));
                self.record_cache = Some(object);
                self.locked = true;
            }
            None => {
                self.execute()?;
                let count = match self.count()? {
                    total if total >= 0 => total,
                    _ => self.cached_hits() as i64,
                };
                if count > 1 {
                    return Err(QueryError::MultipleResults {
                        count,
                        model: self.model_name.clone(),
                    });
                }
            }
        }
        self.get_one()
    }

    /// Hits held by the cached search response
    fn cached_hits(&self) -> usize {
        self.search_cache
            .as_ref()
            .map_or(0, |response| response.docs.len())
    }

    /// First record, without checking how many matched
    pub fn get_one(&mut self) -> QueryResult<(Value, String)> {
        if self.record_cache.is_none() {
            self.execute()?;
            let first = self
                .search_cache
                .as_ref()
                .and_then(|response| response.docs.first())
                .map(|doc| doc.row_key.clone());

            let key = match first {
                Some(key) => key,
                None => {
                    return Err(QueryError::NotFound {
                        bucket: self.index_name(),
                        query: self.compiled.clone().unwrap_or_default(),
                    })
                }
            };

            let object = self.fetch(&key)?;
            if !object.exists() {
                return Err(index_lag(self.index_name(), key));
            }
            self.record_cache = Some(object);
        }

        match &self.record_cache {
            Some(object) => record_pair(object),
            None => Err(QueryError::NotFound {
                bucket: self.index_name(),
                query: self.debug_data(),
            }),
        }
    }

    /// Every match as `(document, key)`, fetched from the store lazily.
    ///
    /// Executes on the first call; each call iterates the cached hits anew.
    pub fn iter(&mut self) -> QueryResult<Hits> {
        self.execute()?;
        let docs = self
            .search_cache
            .as_ref()
            .map(|response| response.docs.clone())
            .unwrap_or_default();

        Ok(Hits {
            docs: docs.into_iter(),
            store: Arc::clone(&self.store),
            sink: self.config.debug.then(|| Arc::clone(&self.sink)),
            index: self.index_name(),
        })
    }

    /// Query, index and parameters, as appended to engine errors
    pub fn debug_data(&self) -> String {
        let query = match &self.compiled {
            Some(query) => query.clone(),
            None => QueryCompiler::new(&self.fields).compile(&self.clauses),
        };
        format!(
            "query: {}, bucket: {}, params: {}",
            query,
            self.index_name(),
            self.params
        )
    }

    /// A query with the same handles and no clauses
    fn fresh(&self) -> QuerySet {
        QuerySet::new(
            Arc::clone(&self.store),
            Arc::clone(&self.engine),
            Arc::clone(&self.config),
        )
        .with_fields(Arc::clone(&self.fields))
        .with_model_name(self.model_name.clone())
        .with_sink(Arc::clone(&self.sink))
    }

    /// Number of non-deleted records per value of `field`
    pub fn distinct_values_of(
        &self,
        field: &str,
        fetcher: &dyn FacetFetcher,
    ) -> QueryResult<BTreeMap<String, u64>> {
        let url = facet_url(&self.config.facet_endpoint(), field);
        let body = fetcher.fetch(&url).map_err(QueryError::Facet)?;
        parse_facet_counts(&body, field)
    }

    /// Delete every record in the bucket and return how many there were.
    ///
    /// With `wait`, blocks until the index reports no records.
    pub fn clear(&self, wait: bool) -> QueryResult<usize> {
        let keys = self.store.keys()?;
        for key in &keys {
            self.store.delete(key)?;
        }

        if wait {
            let index = self.index_name();
            let deleted = keys.len().to_string();
            let scope = ObservationScope::with_fields(
                "BUCKET_CLEAR",
                &[("deleted", deleted.as_str()), ("index", index.as_str())],
            );
            loop {
                let remaining = match self.fresh().count() {
                    Ok(remaining) => remaining,
                    Err(e) => {
                        scope.fail(&e.to_string());
                        return Err(e);
                    }
                };
                scope.poll();
                if remaining <= 0 {
                    break;
                }
                thread::sleep(self.config.clear_poll_interval());
            }
            scope.complete();
        }

        Ok(keys.len())
    }
}

impl Clone for QuerySet {
    /// Copies clauses and parameters, shares the store and engine handles,
    /// and starts unlocked with empty caches
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            engine: Arc::clone(&self.engine),
            config: Arc::clone(&self.config),
            fields: Arc::clone(&self.fields),
            model_name: self.model_name.clone(),
            sink: Arc::clone(&self.sink),
            clauses: self.clauses.clone(),
            params: self.params.clone(),
            compiled: None,
            locked: false,
            search_cache: None,
            count_cache: None,
            record_cache: None,
        }
    }
}

impl std::fmt::Debug for QuerySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySet")
            .field("index", &self.index_name())
            .field("clauses", &self.clauses)
            .field("params", &self.params)
            .field("compiled", &self.compiled)
            .field("locked", &self.locked)
            .finish()
    }
}

/// Lazy iterator over the cached hits of an executed query
pub struct Hits {
    docs: std::vec::IntoIter<SearchDoc>,
    store: Arc<dyn DocumentStore>,
    sink: Option<Arc<dyn ObservabilitySink>>,
    index: String,
}

impl Iterator for Hits {
    type Item = QueryResult<(Value, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let doc = self.docs.next()?;
        let object = match self.store.get(&doc.row_key) {
            Ok(object) => object,
            Err(e) => return Some(Err(e.into())),
        };
        if let Some(sink) = &self.sink {
            sink.record_read(self.store.name(), &doc.row_key);
        }
        if !object.exists() {
            return Some(Err(index_lag(self.index.clone(), doc.row_key)));
        }
        Some(record_pair(&object))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.docs.size_hint()
    }
}

fn num_found(response: &SearchResponse) -> i64 {
    response.num_found.map(|n| n as i64).unwrap_or(-1)
}

fn index_lag(bucket: String, key: String) -> QueryError {
    log_event_with_fields(Event::IndexLag, &[("bucket", bucket.as_str()), ("key", key.as_str())]);
    QueryError::IndexLag { bucket, key }
}

fn record_pair(object: &StoredObject) -> QueryResult<(Value, String)> {
    match (object.data(), object.key()) {
        (Some(data), Some(key)) => Ok((data.clone(), key.to_string())),
        _ => Err(QueryError::NotFound {
            bucket: String::new(),
            query: object.key().unwrap_or_default().to_string(),
        }),
    }
}
