//! Batch barrier tests
//!
//! After a batch returns, every record created inside it must be visible to
//! searches, however far the index lags the store.

mod common;

use solrset::{ClauseValue, QueryError};

use common::{config, fixture_with, Person};

/// Test: a lagging index has caught up with the batch once it returns.
#[test]
fn test_batch_waits_for_lagging_index() {
    let fx = fixture_with(config(), 3);

    let keys = fx
        .adapter
        .batch(|batch| {
            let mut keys = Vec::new();
            for i in 0..5 {
                let outcome = fx.adapter.save(&mut Person::new("p", i), None, Some(batch))?;
                keys.push(outcome.key);
            }
            assert_eq!(batch.pending(), keys);
            Ok(keys)
        })
        .unwrap();

    let mut check = fx.adapter.query();
    check
        .filter("key__in", ClauseValue::sequence(keys.iter().cloned()))
        .unwrap();
    assert_eq!(check.count().unwrap(), 5);
}

/// Test: overwrites inside a batch are not waited for.
#[test]
fn test_updates_not_recorded() {
    let fx = fixture_with(config(), 0);
    let mut john = Person::new("john", 30);
    fx.adapter.save(&mut john, None, None).unwrap();

    fx.adapter
        .batch(|batch| {
            john.age = 31;
            fx.adapter.save(&mut john, None, Some(batch))?;
            assert!(batch.pending().is_empty());
            Ok(())
        })
        .unwrap();
    assert_eq!(fx.index.search_count(), 0);
}

/// Test: a failing batch body is returned without waiting.
#[test]
fn test_failing_body_skips_wait() {
    let fx = fixture_with(config(), 100);

    let err = fx
        .adapter
        .batch(|batch| -> Result<(), QueryError> {
            fx.adapter.save(&mut Person::new("p", 1), None, Some(batch))?;
            Err(QueryError::Facet("aborted".into()))
        })
        .unwrap_err();

    assert_eq!(err.code(), "QUERY_FACET_FAILED");
    assert_eq!(fx.index.search_count(), 0);
}

/// Test: a bounded wait gives up with a timeout error.
#[test]
fn test_bounded_batch_times_out() {
    let fx = fixture_with(config().with_batch_max_attempts(3), 100);

    let err = fx
        .adapter
        .batch(|batch| {
            fx.adapter.save(&mut Person::new("p", 1), None, Some(batch))?;
            fx.adapter.save(&mut Person::new("p", 2), None, Some(batch))?;
            Ok(())
        })
        .unwrap_err();

    assert_eq!(err.code(), "QUERY_BATCH_TIMEOUT");
    assert!(err.to_string().contains("missing 2 of 2"));
    assert_eq!(fx.index.search_count(), 3);
}
