//! Activity log entry
//!
//! One append-only entry per save: the save metadata, the version key it
//! refers to, the time, and the acting user and role when known.

use serde::{Deserialize, Serialize};

use crate::model::SaveMeta;
use crate::store::{IndexValue, StoredObject};

use super::context::ActingContext;
use super::version::{KEY_INDEX, TIMESTAMP_INDEX};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    #[serde(flatten)]
    meta: SaveMeta,
    /// Version key; empty when versioning is off
    key: String,
    timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role_id: Option<String>,
}

impl ActivityLogEntry {
    pub fn new(
        version_key: impl Into<String>,
        meta: Option<SaveMeta>,
        timestamp: f64,
        context: Option<&ActingContext>,
    ) -> Self {
        Self {
            meta: meta.unwrap_or_default(),
            key: version_key.into(),
            timestamp,
            user_id: context.map(|c| c.user_id.clone()),
            role_id: context.map(|c| c.role_id.clone()),
        }
    }

    pub fn version_key(&self) -> &str {
        &self.key
    }

    pub fn meta(&self) -> &SaveMeta {
        &self.meta
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn role_id(&self) -> Option<&str> {
        self.role_id.as_deref()
    }

    pub fn to_stored_object(&self) -> serde_json::Result<StoredObject> {
        let mut object = StoredObject::new(serde_json::to_value(self)?);
        object
            .add_index(KEY_INDEX, IndexValue::Bin(self.key.clone()))
            .add_index(TIMESTAMP_INDEX, IndexValue::Int(self.timestamp.trunc() as i64));
        Ok(object)
    }
}
