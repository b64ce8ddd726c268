//! Write pipeline tests
//!
//! Covers what one save leaves behind:
//! - The data record (create vs overwrite)
//! - Version history
//! - Activity log entries
//! - Debug sink accounting

mod common;

use serde_json::{json, Map, Value};

use solrset::store::{DocumentStore, IndexValue};
use solrset::write::{VersionRecord, KEY_INDEX, TIMESTAMP_INDEX};
use solrset::ActingContext;

use common::{config, fixture, fixture_with, Person};

fn versions(store: &dyn DocumentStore) -> Vec<VersionRecord> {
    let mut records: Vec<VersionRecord> = store
        .keys()
        .unwrap()
        .iter()
        .map(|key| store.get(key).unwrap().into_data().unwrap())
        .map(|data| serde_json::from_value(data).unwrap())
        .collect();
    records.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));
    records
}

fn activity(store: &dyn DocumentStore) -> Vec<Value> {
    store
        .keys()
        .unwrap()
        .iter()
        .map(|key| store.get(key).unwrap().into_data().unwrap())
        .collect()
}

fn meta(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// =============================================================================
// CREATE VS UPDATE
// =============================================================================

/// Test: first save creates and assigns a key, the next overwrites it.
#[test]
fn test_create_then_update() {
    let fx = fixture();
    let mut john = Person::new("john", 30);

    let first = fx.adapter.save(&mut john, None, None).unwrap();
    assert!(first.created);
    assert_eq!(john.key.as_deref(), Some(first.key.as_str()));

    john.age = 31;
    let second = fx.adapter.save(&mut john, None, None).unwrap();
    assert!(!second.created);
    assert_eq!(second.key, first.key);

    let stored = fx.adapter.buckets().data.get(&first.key).unwrap();
    assert_eq!(stored.data().unwrap()["age"], 31);
    assert_eq!(fx.adapter.buckets().data.keys().unwrap().len(), 1);
}

/// Test: the model receives the cleaned document, defaults included.
#[test]
fn test_model_receives_cleaned_data() {
    let fx = fixture();
    let mut john = Person::new("john", 30);
    fx.adapter.save(&mut john, None, None).unwrap();
    assert_eq!(john.data, json!({"name": "john", "age": 30, "deleted": false}));
}

// =============================================================================
// VERSION HISTORY
// =============================================================================

/// Test: one version per save, each a snapshot keyed to the data record.
#[test]
fn test_one_version_per_save() {
    let fx = fixture();
    let mut john = Person::new("john", 30);
    let key = fx.adapter.save(&mut john, None, None).unwrap().key;
    for age in 31..34 {
        john.age = age;
        fx.adapter.save(&mut john, None, None).unwrap();
    }

    let history = versions(fx.adapter.buckets().versions.as_ref());
    assert_eq!(history.len(), 4);
    assert!(history.iter().all(|v| v.key() == key));

    let mut ages: Vec<i64> = history
        .iter()
        .map(|v| v.data()["age"].as_i64().unwrap())
        .collect();
    ages.sort();
    assert_eq!(ages, vec![30, 31, 32, 33]);
}

/// Test: version objects carry key and whole-second indexes.
#[test]
fn test_version_indexes() {
    let fx = fixture();
    let outcome = fx
        .adapter
        .save(&mut Person::new("john", 30), None, None)
        .unwrap();
    let version_key = outcome.version_key.unwrap();

    let object = fx.adapter.buckets().versions.get(&version_key).unwrap();
    let record: VersionRecord = serde_json::from_value(object.data().unwrap().clone()).unwrap();

    let indexes = object.indexes();
    assert!(indexes
        .iter()
        .any(|i| i.name == KEY_INDEX && i.value == IndexValue::Bin(outcome.key.clone())));
    assert!(indexes.iter().any(|i| i.name == TIMESTAMP_INDEX
        && i.value == IndexValue::Int(record.timestamp().trunc() as i64)));
}

/// Test: explicit meta wins over the model's own.
#[test]
fn test_meta_precedence() {
    let fx = fixture();
    let mut john = Person::new("john", 30);
    john.meta = Some(meta(&[("reason", json!("model"))]));

    fx.adapter.save(&mut john, None, None).unwrap();
    fx.adapter
        .save(&mut john, Some(meta(&[("reason", json!("caller"))])), None)
        .unwrap();

    let mut reasons: Vec<String> = versions(fx.adapter.buckets().versions.as_ref())
        .iter()
        .map(|v| v.meta().unwrap()["reason"].as_str().unwrap().to_string())
        .collect();
    reasons.sort();
    assert_eq!(reasons, vec!["caller", "model"]);
}

// =============================================================================
// ACTIVITY LOG
// =============================================================================

/// Test: each save logs one entry pointing at its version, with meta merged
/// at the top level.
#[test]
fn test_activity_entry_references_version() {
    let fx = fixture();
    let outcome = fx
        .adapter
        .save(
            &mut Person::new("john", 30),
            Some(meta(&[("action", json!("signup"))])),
            None,
        )
        .unwrap();

    let entries = activity(fx.adapter.buckets().activity.as_ref());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["key"], json!(outcome.version_key.unwrap()));
    assert_eq!(entries[0]["action"], "signup");
    assert!(entries[0]["timestamp"].as_f64().unwrap() > 0.0);
    assert!(entries[0].get("user_id").is_none());
}

/// Test: an acting context stamps user and role onto entries.
#[test]
fn test_activity_with_acting_context() {
    let fx = fixture();
    let adapter = fx.adapter.with_context(ActingContext::new("u-7", "r-admin"));
    adapter.save(&mut Person::new("john", 30), None, None).unwrap();

    let entries = activity(adapter.buckets().activity.as_ref());
    assert_eq!(entries[0]["user_id"], "u-7");
    assert_eq!(entries[0]["role_id"], "r-admin");
}

/// Test: toggles skip the side records but not the document.
#[test]
fn test_side_records_disabled() {
    let fx = fixture_with(
        config().with_versions(false).with_activity_logging(false),
        0,
    );
    let outcome = fx
        .adapter
        .save(&mut Person::new("john", 30), None, None)
        .unwrap();

    assert!(outcome.version_key.is_none());
    assert!(fx.adapter.buckets().versions.keys().unwrap().is_empty());
    assert!(fx.adapter.buckets().activity.keys().unwrap().is_empty());
    assert!(fx.adapter.buckets().data.get(&outcome.key).unwrap().exists());
}

// =============================================================================
// DEBUG SINK
// =============================================================================

/// Test: creations and updates are told apart in debug mode.
#[test]
fn test_sink_counts_saves_and_updates() {
    let fx = fixture_with(config().with_debug(1), 0);
    let mut john = Person::new("john", 30);
    let key = fx.adapter.save(&mut john, None, None).unwrap().key;
    fx.adapter.save(&mut john, None, None).unwrap();
    fx.adapter.save(&mut Person::new("jane", 28), None, None).unwrap();

    let snap = fx.stats.snapshot();
    assert_eq!(snap.saves, 2);
    assert_eq!(snap.updates, 1);

    let touched = fx.stats.keys_for("person");
    assert_eq!(touched.len(), 3);
    assert_eq!(touched[0], key);
    assert_eq!(touched[1], key);
}

/// Test: nothing reaches the sink when debug is off.
#[test]
fn test_sink_silent_without_debug() {
    let fx = fixture();
    fx.adapter.save(&mut Person::new("john", 30), None, None).unwrap();
    assert_eq!(fx.stats.snapshot().saves, 0);
    assert!(fx.stats.keys_for("person").is_empty());
}
