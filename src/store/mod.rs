//! Document store and search engine seams
//!
//! The query layer never talks to a cluster directly. It reads and writes
//! records through [`DocumentStore`] and runs compiled queries through
//! [`SearchEngine`]. In-memory implementations live in [`memory`].

mod errors;
pub mod memory;
mod object;
mod search;

pub use errors::{SearchError, StoreError, StoreResult};
pub use object::{IndexValue, SecondaryIndex, StoredObject};
pub use search::{QueryParameters, SearchDoc, SearchEngine, SearchResponse, ROW_KEY_FIELD};

/// Trait for a key-value bucket of JSON documents
pub trait DocumentStore: Send + Sync {
    /// Bucket name, used in diagnostics
    fn name(&self) -> &str;

    /// Read the record at `key`.
    ///
    /// A missing key is not an error: the returned object has
    /// `exists() == false`.
    fn get(&self, key: &str) -> StoreResult<StoredObject>;

    /// Write the object. Keyless objects are assigned a fresh key, which is
    /// set on `object` before returning.
    fn store(&self, object: &mut StoredObject) -> StoreResult<()>;

    /// Delete the record at `key`
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Every key currently in the bucket
    fn keys(&self) -> StoreResult<Vec<String>>;
}
