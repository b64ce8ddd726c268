//! Shared fixtures: a `Person` model and in-memory adapters

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use solrset::model::{FieldDescriptor, Model, ModelResult, SaveMeta, SolrType};
use solrset::observability::StatCounters;
use solrset::store::memory::MemorySearchIndex;
use solrset::{Adapter, AdapterConfig, Buckets};

pub struct Person {
    pub key: Option<String>,
    pub name: String,
    pub age: i64,
    pub data: Value,
    pub meta: Option<SaveMeta>,
}

impl Person {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            key: None,
            name: name.to_string(),
            age,
            data: Value::Null,
            meta: None,
        }
    }
}

impl Model for Person {
    fn model_name(&self) -> &str {
        "Person"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("name", SolrType::String),
            FieldDescriptor::new("age", SolrType::Int),
            FieldDescriptor::new("birth", SolrType::Date).optional(),
            FieldDescriptor::new("deleted", SolrType::Boolean)
                .optional()
                .with_default(json!(false)),
        ]
    }

    fn clean_value(&self) -> ModelResult<Value> {
        Ok(json!({ "name": self.name, "age": self.age }))
    }

    fn set_data(&mut self, data: Value) {
        self.data = data;
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn set_key(&mut self, key: String) {
        self.key = Some(key);
    }

    fn save_meta_data(&self) -> Option<SaveMeta> {
        self.meta.clone()
    }
}

pub fn config() -> AdapterConfig {
    AdapterConfig::new("models", "person")
        .with_batch_poll_interval(Duration::from_millis(1))
        .with_clear_poll_interval(Duration::from_millis(1))
}

pub struct Fixture {
    pub index: Arc<MemorySearchIndex>,
    pub stats: Arc<StatCounters>,
    pub adapter: Adapter,
}

/// Adapter over fresh in-memory buckets; created keys become searchable
/// after `lag` searches
pub fn fixture_with(config: AdapterConfig, lag: usize) -> Fixture {
    let index = Arc::new(MemorySearchIndex::new());
    let stats = Arc::new(StatCounters::new());
    let buckets = Buckets::in_memory(&config, Arc::clone(&index), lag);
    let adapter = Adapter::new(config, buckets, index.clone())
        .for_model(&Person::new("", 0))
        .with_sink(stats.clone());
    Fixture {
        index,
        stats,
        adapter,
    }
}

pub fn fixture() -> Fixture {
    fixture_with(config(), 0)
}
