//! Batch-save barrier
//!
//! The search index trails the document store. A `BatchSave` handle collects
//! the keys of records created through it; `finish` blocks until a key
//! search over those keys counts all of them, polling at a fixed interval.
//!
//! ```ignore
//! adapter.batch(|batch| {
//!     for person in people.iter_mut() {
//!         adapter.save(person, None, Some(batch))?;
//!     }
//!     Ok(())
//! })?;
//! // every created person is now searchable
//! ```
//!
//! The pending list is single-writer: one handle, one thread.

use std::cell::RefCell;
use std::thread;

use crate::observability::ObservationScope;
use crate::query::{ClauseValue, QueryError, QueryResult};

use super::pipeline::Adapter;

/// Collects created keys and waits for the index to catch up with them
pub struct BatchSave<'a> {
    adapter: &'a Adapter,
    pending: RefCell<Vec<String>>,
}

impl<'a> BatchSave<'a> {
    /// Start collecting with an empty pending list
    pub fn begin(adapter: &'a Adapter) -> Self {
        Self {
            adapter,
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Register a created key
    pub fn record(&self, key: impl Into<String>) {
        self.pending.borrow_mut().push(key.into());
    }

    /// Keys registered so far
    pub fn pending(&self) -> Vec<String> {
        self.pending.borrow().clone()
    }

    /// Block until every pending key is searchable and return how many there
    /// were.
    ///
    /// Polls without bound unless the adapter sets `batch_max_attempts`, in
    /// which case running out of polls fails with
    /// [`QueryError::BatchTimeout`].
    pub fn finish(self) -> QueryResult<usize> {
        let adapter = self.adapter;
        let keys = self.pending.into_inner();
        if keys.is_empty() {
            return Ok(0);
        }

        let config = adapter.config();
        let expected = keys.len();
        let index = config.index_name();
        let pending = expected.to_string();
        let scope = ObservationScope::with_fields(
            "BATCH_WAIT",
            &[("index", index.as_str()), ("pending", pending.as_str())],
        );

        loop {
            let indexed = match indexed_count(adapter, &keys) {
                Ok(count) => count,
                Err(e) => {
                    scope.fail(&e.to_string());
                    return Err(e);
                }
            };
            let attempts = scope.poll();

            if indexed >= expected as i64 {
                break;
            }

            if let Some(max) = config.batch_max_attempts {
                if attempts >= max {
                    let missing = expected - indexed.max(0) as usize;
                    scope.fail("index did not catch up");
                    return Err(QueryError::BatchTimeout {
                        bucket: index,
                        pending: expected,
                        missing,
                        attempts,
                    });
                }
            }

            thread::sleep(config.batch_poll_interval());
        }

        scope.complete();
        Ok(expected)
    }
}

/// Indexed count of `keys`, from a fresh query
fn indexed_count(adapter: &Adapter, keys: &[String]) -> QueryResult<i64> {
    let mut query = adapter.query();
    query.filter("key__in", ClauseValue::sequence(keys.iter().cloned()))?;
    query.count()
}
