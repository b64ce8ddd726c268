//! In-memory store and search index
//!
//! Used by tests and by callers that want the query layer without a cluster.
//! The search index only understands row-key terms (`_yz_rk:<key>`); every
//! other clause is accepted and ignored. Indexing can be made to lag behind
//! writes by a number of searches to reproduce the store/index consistency
//! window.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use regex::Regex;
use uuid::Uuid;

use super::errors::{SearchError, StoreError, StoreResult};
use super::object::StoredObject;
use super::search::{QueryParameters, SearchEngine, SearchResponse};
use super::DocumentStore;

/// A search request as the in-memory index received it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSearch {
    pub query: String,
    pub index: String,
    pub params: QueryParameters,
}

#[derive(Debug, Default)]
struct IndexState {
    /// Keys visible to searches, in indexing order
    visible: Vec<String>,
    /// Keys waiting to become visible, with the searches left before they do
    pending: VecDeque<(String, usize)>,
    searches: Vec<RecordedSearch>,
    scripted: VecDeque<Result<SearchResponse, SearchError>>,
}

/// In-memory search index over row keys
#[derive(Debug)]
pub struct MemorySearchIndex {
    state: Mutex<IndexState>,
    row_key_term: Regex,
}

impl Default for MemorySearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(IndexState::default()),
            // Captures the value of a row-key term, stopping at whitespace
            // or an unescaped closing parenthesis.
            row_key_term: Regex::new(r"_yz_rk:((?:\\.|[^\s()\\])+)").expect("static regex"),
        }
    }

    /// Make `key` visible to searches immediately
    pub fn index(&self, key: impl Into<String>) {
        self.index_after(key, 0);
    }

    /// Make `key` visible after `searches` more searches have run
    pub fn index_after(&self, key: impl Into<String>, searches: usize) {
        if let Ok(mut state) = self.state.lock() {
            let key = key.into();
            if searches == 0 {
                if !state.visible.contains(&key) {
                    state.visible.push(key);
                }
            } else {
                state.pending.push_back((key, searches));
            }
        }
    }

    /// Drop `key` from the index
    pub fn remove(&self, key: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.visible.retain(|k| k != key);
            state.pending.retain(|(k, _)| k != key);
        }
    }

    /// Queue a response (or failure) to return from the next search instead
    /// of evaluating the query
    pub fn respond_with(&self, response: Result<SearchResponse, SearchError>) {
        if let Ok(mut state) = self.state.lock() {
            state.scripted.push_back(response);
        }
    }

    /// Every search received so far
    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.state
            .lock()
            .map(|state| state.searches.clone())
            .unwrap_or_default()
    }

    pub fn search_count(&self) -> usize {
        self.state.lock().map(|state| state.searches.len()).unwrap_or(0)
    }

    fn requested_keys(&self, query: &str) -> Vec<String> {
        self.row_key_term
            .captures_iter(query)
            .filter_map(|caps| caps.get(1))
            .map(|m| unescape(m.as_str()))
            .collect()
    }

    fn advance_pending(state: &mut IndexState) {
        let mut still_pending = VecDeque::with_capacity(state.pending.len());
        while let Some((key, left)) = state.pending.pop_front() {
            if left <= 1 {
                if !state.visible.contains(&key) {
                    state.visible.push(key);
                }
            } else {
                still_pending.push_back((key, left - 1));
            }
        }
        state.pending = still_pending;
    }
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl SearchEngine for MemorySearchIndex {
    fn search(
        &self,
        query: &str,
        index: &str,
        params: &QueryParameters,
    ) -> Result<SearchResponse, SearchError> {
        let requested = self.requested_keys(query);
        let mut state = self
            .state
            .lock()
            .map_err(|_| SearchError::new("search index lock poisoned"))?;

        state.searches.push(RecordedSearch {
            query: query.to_string(),
            index: index.to_string(),
            params: params.clone(),
        });

        if let Some(scripted) = state.scripted.pop_front() {
            return scripted;
        }

        let matched: Vec<String> = state
            .visible
            .iter()
            .filter(|key| requested.is_empty() || requested.contains(key))
            .cloned()
            .collect();

        Self::advance_pending(&mut state);

        let total = matched.len() as u64;
        let rows = params.rows().map(|r| r as usize).unwrap_or(matched.len());
        let start = params
            .get("start")
            .and_then(|v| v.as_u64())
            .map(|s| s as usize)
            .unwrap_or(0);
        let page = matched.into_iter().skip(start).take(rows);

        let mut response = SearchResponse::from_keys(page);
        response.num_found = Some(total);
        Ok(response)
    }
}

/// In-memory key-value bucket
pub struct MemoryBucket {
    name: String,
    records: RwLock<BTreeMap<String, StoredObject>>,
    /// Index fed by writes, with its lag in searches
    index: Option<(Arc<MemorySearchIndex>, usize)>,
}

impl MemoryBucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(BTreeMap::new()),
            index: None,
        }
    }

    /// Feed every created key into `index`, visible after `lag` searches
    pub fn with_index(mut self, index: Arc<MemorySearchIndex>, lag: usize) -> Self {
        self.index = Some((index, lag));
        self
    }

    /// Place a record directly, bypassing the index feed
    pub fn insert_raw(&self, key: impl Into<String>, data: serde_json::Value) -> StoreResult<()> {
        let key = key.into();
        let mut records = self.write_records()?;
        records.insert(key.clone(), StoredObject::with_key(key, data));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write_records(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, StoredObject>>> {
        self.records
            .write()
            .map_err(|_| StoreError::Poisoned(self.name.clone()))
    }
}

impl DocumentStore for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> StoreResult<StoredObject> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Poisoned(self.name.clone()))?;
        Ok(records
            .get(key)
            .cloned()
            .unwrap_or_else(|| StoredObject::missing(key)))
    }

    fn store(&self, object: &mut StoredObject) -> StoreResult<()> {
        if !object.exists() {
            return Err(StoreError::EmptyObject(
                object.key().unwrap_or("<new>").to_string(),
            ));
        }

        let created = object.key().is_none();
        if created {
            object.set_key(Uuid::new_v4().simple().to_string());
        }
        let key = object.key().unwrap_or_default().to_string();

        self.write_records()?.insert(key.clone(), object.clone());

        if created {
            if let Some((index, lag)) = &self.index {
                index.index_after(key, *lag);
            }
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.write_records()?.remove(key);
        if let Some((index, _)) = &self.index {
            index.remove(key);
        }
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Poisoned(self.name.clone()))?;
        Ok(records.keys().cloned().collect())
    }
}
