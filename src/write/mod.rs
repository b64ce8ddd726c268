//! Write path
//!
//! [`Adapter::save`] persists a model and writes its version record and
//! activity log entry. [`BatchSave`] lets a caller wait for the search index
//! to see every record created during a batch.

mod activity;
mod barrier;
mod context;
mod pipeline;
mod version;

pub use activity::ActivityLogEntry;
pub use barrier::BatchSave;
pub use context::ActingContext;
pub use pipeline::{Adapter, Buckets, SaveOutcome};
pub use version::{VersionRecord, KEY_INDEX, TIMESTAMP_INDEX};
