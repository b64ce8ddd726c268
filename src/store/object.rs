//! Stored object handle
//!
//! A key-value record as the document store hands it out: an optional key
//! (absent until the store assigns one), optional data (absent when the key
//! does not exist), and the secondary indexes to write alongside it.

use serde_json::Value;

/// Value of a secondary index entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexValue {
    /// Binary (string) index, `*_bin`
    Bin(String),
    /// Integer index, `*_int`
    Int(i64),
}

/// A named secondary index entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIndex {
    pub name: String,
    pub value: IndexValue,
}

/// A document store record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredObject {
    key: Option<String>,
    data: Option<Value>,
    indexes: Vec<SecondaryIndex>,
}

impl StoredObject {
    /// A new, keyless object; the store assigns the key on `store`
    pub fn new(data: Value) -> Self {
        Self {
            key: None,
            data: Some(data),
            indexes: Vec::new(),
        }
    }

    /// An object addressed by key, carrying data to overwrite it with
    pub fn with_key(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: Some(key.into()),
            data: Some(data),
            indexes: Vec::new(),
        }
    }

    /// The result of reading a key that does not exist
    pub fn missing(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            data: None,
            indexes: Vec::new(),
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Set by the store when it assigns a key
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: Value) {
        self.data = Some(data);
    }

    pub fn into_data(self) -> Option<Value> {
        self.data
    }

    /// True when the record is present in the store
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn add_index(&mut self, name: impl Into<String>, value: IndexValue) -> &mut Self {
        self.indexes.push(SecondaryIndex {
            name: name.into(),
            value,
        });
        self
    }

    pub fn indexes(&self) -> &[SecondaryIndex] {
        &self.indexes
    }
}
