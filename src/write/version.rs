//! Version record
//!
//! An immutable snapshot of a document as it was saved:
//! - Written once per save, never updated or deleted
//! - Indexed by the data key (`key_bin`) and by the save second
//!   (`timestamp_int`)
//!
//! Fields are private; a record only offers construction and access.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::SaveMeta;
use crate::store::{IndexValue, StoredObject};

/// Secondary index on the source key
pub const KEY_INDEX: &str = "key_bin";

/// Secondary index on the whole-second timestamp
pub const TIMESTAMP_INDEX: &str = "timestamp_int";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    data: Value,
    key: String,
    meta: Option<SaveMeta>,
    /// Seconds since the epoch, sub-second precision
    timestamp: f64,
}

impl VersionRecord {
    pub fn new(data: Value, key: impl Into<String>, meta: Option<SaveMeta>, timestamp: f64) -> Self {
        Self {
            data,
            key: key.into(),
            meta,
            timestamp,
        }
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Key of the saved record this is a version of
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn meta(&self) -> Option<&SaveMeta> {
        self.meta.as_ref()
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// A new, keyless store object carrying this record and its indexes
    pub fn to_stored_object(&self) -> serde_json::Result<StoredObject> {
        let mut object = StoredObject::new(serde_json::to_value(self)?);
        object
            .add_index(KEY_INDEX, IndexValue::Bin(self.key.clone()))
            .add_index(TIMESTAMP_INDEX, IndexValue::Int(self.timestamp.trunc() as i64));
        Ok(object)
    }
}
