//! Write pipeline
//!
//! `save` stores the cleaned document first, then the side records:
//!
//! 1. Clean the model, fill declared defaults on creation, check required
//!    fields
//! 2. Create (store assigns the key) or overwrite in place
//! 3. Version record, if enabled
//! 4. Activity log entry referencing the version, if enabled
//! 5. Register created keys with the batch handle, if one is passed
//!
//! A failure in step 3 or 4 is returned after the document is already
//! stored; nothing is rolled back.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;

use crate::config::AdapterConfig;
use crate::model::{check_required, FieldMap, Model, SaveMeta};
use crate::observability::{log_event_with_fields, Event, NoopSink, ObservabilitySink};
use crate::query::{QueryResult, QuerySet};
use crate::store::memory::{MemoryBucket, MemorySearchIndex};
use crate::store::{DocumentStore, SearchEngine, StoredObject};

use super::activity::ActivityLogEntry;
use super::barrier::BatchSave;
use super::context::ActingContext;
use super::version::VersionRecord;

/// The three buckets one model writes to
#[derive(Clone)]
pub struct Buckets {
    pub data: Arc<dyn DocumentStore>,
    pub versions: Arc<dyn DocumentStore>,
    pub activity: Arc<dyn DocumentStore>,
}

impl Buckets {
    /// In-memory buckets named after `config`, the data bucket feeding
    /// `index` with `lag` searches of delay
    pub fn in_memory(config: &AdapterConfig, index: Arc<MemorySearchIndex>, lag: usize) -> Self {
        Self {
            data: Arc::new(MemoryBucket::new(config.bucket_name.clone()).with_index(index, lag)),
            versions: Arc::new(MemoryBucket::new(config.version_bucket_name())),
            activity: Arc::new(MemoryBucket::new(config.log_bucket_name())),
        }
    }
}

/// Result of a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub key: String,
    /// False when an existing record was overwritten
    pub created: bool,
    /// Key of the version record, when versioning is enabled
    pub version_key: Option<String>,
}

/// Query and write access to one model's buckets
pub struct Adapter {
    config: Arc<AdapterConfig>,
    buckets: Buckets,
    engine: Arc<dyn SearchEngine>,
    fields: Arc<FieldMap>,
    model_name: String,
    sink: Arc<dyn ObservabilitySink>,
    context: Option<ActingContext>,
    /// Last version timestamp handed out
    last_timestamp: Mutex<f64>,
}

impl Adapter {
    pub fn new(config: AdapterConfig, buckets: Buckets, engine: Arc<dyn SearchEngine>) -> Self {
        let model_name = config.bucket_name.clone();
        Self {
            config: Arc::new(config),
            buckets,
            engine,
            fields: Arc::new(FieldMap::default()),
            model_name,
            sink: Arc::new(NoopSink),
            context: None,
            last_timestamp: Mutex::new(0.0),
        }
    }

    /// Take the field declarations and name of `model`
    pub fn for_model<M: Model + ?Sized>(mut self, model: &M) -> Self {
        self.fields = Arc::new(FieldMap::new(model.fields()));
        self.model_name = model.model_name().to_string();
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Identity recorded in activity log entries
    pub fn with_context(mut self, context: ActingContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn context(&self) -> Option<&ActingContext> {
        self.context.as_ref()
    }

    /// A new, empty query over the data bucket
    pub fn query(&self) -> QuerySet {
        QuerySet::new(
            Arc::clone(&self.buckets.data),
            Arc::clone(&self.engine),
            Arc::clone(&self.config),
        )
        .with_fields(Arc::clone(&self.fields))
        .with_model_name(self.model_name.clone())
        .with_sink(Arc::clone(&self.sink))
    }

    /// Persist `model`.
    ///
    /// `meta` defaults to the model's own save metadata. When `batch` is
    /// given, created keys are registered with it.
    pub fn save<M: Model + ?Sized>(
        &self,
        model: &mut M,
        meta: Option<SaveMeta>,
        batch: Option<&BatchSave<'_>>,
    ) -> QueryResult<SaveOutcome> {
        // no key means nothing to overwrite, whatever the model reports
        let created = model.key().is_none() || !model.exists();

        let mut document = model.clean_value()?;
        if created {
            self.fill_defaults(&mut document);
        }
        check_required(model.model_name(), &self.fields, &document)?;
        model.set_data(document.clone());

        let mut object = match model.key() {
            Some(key) if !created => StoredObject::with_key(key, document.clone()),
            _ => StoredObject::new(document.clone()),
        };
        self.buckets.data.store(&mut object)?;
        let key = object.key().unwrap_or_default().to_string();
        if created {
            model.set_key(key.clone());
        }

        let meta = meta.or_else(|| model.save_meta_data());

        let version_key = if self.config.enable_versions {
            Some(self.write_version(document, &key, meta.clone())?)
        } else {
            None
        };

        if self.config.enable_activity_logging {
            self.write_activity(version_key.as_deref().unwrap_or_default(), meta)?;
        }

        if created {
            if let Some(batch) = batch {
                batch.record(key.clone());
            }
        }

        if self.config.debug {
            self.sink.record_save(self.buckets.data.name(), &key, created);
            let event = if created {
                Event::DocumentCreated
            } else {
                Event::DocumentUpdated
            };
            log_event_with_fields(
                event,
                &[("bucket", self.buckets.data.name()), ("key", key.as_str())],
            );
        }

        Ok(SaveOutcome {
            key,
            created,
            version_key,
        })
    }

    fn fill_defaults(&self, document: &mut Value) {
        if let Value::Object(map) = document {
            for (name, value) in self.fields.defaults() {
                let slot = map.entry(name).or_insert(Value::Null);
                if slot.is_null() {
                    *slot = value;
                }
            }
        }
    }

    /// Seconds since the epoch, never less than the previous call's
    fn next_timestamp(&self) -> f64 {
        let now = epoch_seconds();
        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if now > *last {
            *last = now;
        }
        *last
    }

    fn write_version(&self, data: Value, key: &str, meta: Option<SaveMeta>) -> QueryResult<String> {
        let record = VersionRecord::new(data, key, meta, self.next_timestamp());
        let mut object = record.to_stored_object()?;
        self.buckets.versions.store(&mut object)?;
        let version_key = object.key().unwrap_or_default().to_string();

        if self.config.debug {
            log_event_with_fields(
                Event::VersionWritten,
                &[("key", key), ("version_key", version_key.as_str())],
            );
        }
        Ok(version_key)
    }

    fn write_activity(&self, version_key: &str, meta: Option<SaveMeta>) -> QueryResult<()> {
        let entry = ActivityLogEntry::new(
            version_key,
            meta,
            epoch_seconds(),
            self.context.as_ref(),
        );
        let mut object = entry.to_stored_object()?;
        self.buckets.activity.store(&mut object)?;

        if self.config.debug {
            log_event_with_fields(
                Event::ActivityLogged,
                &[
                    ("bucket", self.buckets.activity.name()),
                    ("version_key", version_key),
                ],
            );
        }
        Ok(())
    }

    /// Run `f` with a batch handle, then wait until the index has every
    /// record created through it.
    ///
    /// If `f` fails its error is returned without waiting.
    pub fn batch<F, T>(&self, f: F) -> QueryResult<T>
    where
        F: FnOnce(&BatchSave<'_>) -> QueryResult<T>,
    {
        let batch = BatchSave::begin(self);
        let value = f(&batch)?;
        batch.finish()?;
        Ok(value)
    }
}

fn epoch_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDescriptor, ModelResult, SolrType};
    use crate::query::QueryError;
    use serde_json::json;

    struct Note {
        key: Option<String>,
        text: Option<String>,
        data: Value,
        loaded: bool,
    }

    impl Note {
        fn new(text: &str) -> Self {
            Self {
                key: None,
                text: Some(text.to_string()),
                data: Value::Null,
                loaded: false,
            }
        }
    }

    impl Model for Note {
        fn model_name(&self) -> &str {
            "Note"
        }

        fn fields(&self) -> Vec<FieldDescriptor> {
            vec![
                FieldDescriptor::new("text", SolrType::Text),
                FieldDescriptor::new("deleted", SolrType::Boolean)
                    .optional()
                    .with_default(json!(false)),
            ]
        }

        fn clean_value(&self) -> ModelResult<Value> {
            Ok(json!({ "text": self.text }))
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

        fn exists(&self) -> bool {
            self.loaded || self.key.is_some()
        }
    }

    fn adapter(config: AdapterConfig) -> Adapter {
        let index = Arc::new(MemorySearchIndex::new());
        let buckets = Buckets::in_memory(&config, Arc::clone(&index), 0);
        Adapter::new(config, buckets, index).for_model(&Note::new(""))
    }

    #[test]
    fn test_defaults_filled_on_create() {
        let adapter = adapter(AdapterConfig::new("models", "note"));
        let mut note = Note::new("hello");
        adapter.save(&mut note, None, None).unwrap();
        assert_eq!(note.data, json!({"text": "hello", "deleted": false}));
    }

    #[test]
    fn test_keyless_model_is_created() {
        let adapter = adapter(AdapterConfig::new("models", "note"));
        let mut note = Note::new("hello");
        note.loaded = true;

        let outcome = adapter.save(&mut note, None, None).unwrap();
        assert!(outcome.created);
        assert_eq!(note.key.as_deref(), Some(outcome.key.as_str()));
        assert_eq!(note.data["deleted"], false);
    }

    #[test]
    fn test_required_field_missing() {
        let adapter = adapter(AdapterConfig::new("models", "note"));
        let mut note = Note::new("x");
        note.text = None;

        let err = adapter.save(&mut note, None, None).unwrap_err();
        assert!(matches!(err, QueryError::Model(_)));
        assert!(note.key.is_none());
    }

    #[test]
    fn test_version_disabled() {
        let adapter = adapter(AdapterConfig::new("models", "note").with_versions(false));
        let mut note = Note::new("x");
        let outcome = adapter.save(&mut note, None, None).unwrap();
        assert!(outcome.version_key.is_none());

        let log = adapter.buckets().activity.keys().unwrap();
        assert_eq!(log.len(), 1);
        let entry = adapter.buckets().activity.get(&log[0]).unwrap();
        assert_eq!(entry.data().unwrap()["key"], "");
    }

    #[test]
    fn test_timestamps_monotonic() {
        let adapter = adapter(AdapterConfig::new("models", "note"));
        let mut previous = 0.0;
        for _ in 0..50 {
            let ts = adapter.next_timestamp();
            assert!(ts >= previous);
            previous = ts;
        }
    }
}
