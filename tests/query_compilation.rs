//! Query compilation tests
//!
//! Covers what a filtered query set sends to the search engine:
//! - Compiled query strings (escaping, modifiers, deleted exclusion)
//! - Sort and row parameters

mod common;

use chrono::NaiveDate;
use serde_json::json;

use solrset::query::{escape_query, EXCLUDE_DELETED};
use solrset::{ClauseValue, FilterClause, Modifier};

use common::fixture;

// =============================================================================
// END-TO-END SCENARIO
// =============================================================================

/// Test: filter + order_by + execute sends the expected query and sort.
#[test]
fn test_filter_order_execute() {
    let fx = fixture();
    let mut people = fx.adapter.query();
    people
        .add_filter([("name", "john", false)])
        .unwrap()
        .order_by(["-timestamp"])
        .unwrap();
    people.execute().unwrap();

    let searches = fx.index.searches();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].query, "name:john AND -deleted:True");
    assert_eq!(searches[0].index, "models_person");
    assert_eq!(searches[0].params.sort(), Some("timestamp desc"));
    assert_eq!(searches[0].params.rows(), Some(1000));
}

/// Test: a query with no clauses still excludes deleted records.
#[test]
fn test_empty_query() {
    let fx = fixture();
    let mut people = fx.adapter.query();
    assert_eq!(people.compile(), "-deleted:True");
}

// =============================================================================
// DELETED EXCLUSION
// =============================================================================

/// Test: exactly one exclusion clause for any mix of clauses that do not
/// mention `deleted`.
#[test]
fn test_single_deleted_exclusion() {
    let fx = fixture();
    let clause_sets: Vec<Vec<FilterClause>> = vec![
        vec![FilterClause::new("name", "a")],
        vec![
            FilterClause::new("name__contains", "a"),
            FilterClause::new("age__gte", 3),
        ],
        vec![
            FilterClause::new("key__in", json!(["k1", "k2"])),
            FilterClause::new("email", ClauseValue::Null),
            FilterClause::new("age__range", ClauseValue::range(1, ClauseValue::Null)),
        ],
    ];

    for clauses in clause_sets {
        let mut people = fx.adapter.query();
        people.add_filter(clauses).unwrap();
        let query = people.compile().to_string();
        assert_eq!(query.matches(EXCLUDE_DELETED).count(), 1, "{}", query);
    }
}

/// Test: asking for deleted records turns the default exclusion off.
#[test]
fn test_deleted_filter_overrides_default() {
    let fx = fixture();
    let mut people = fx.adapter.query();
    people.filter("deleted", true).unwrap();
    assert_eq!(people.compile(), "deleted:True");
}

// =============================================================================
// MODIFIERS AND ESCAPING
// =============================================================================

/// Test: range bounds, open on either side.
#[test]
fn test_range_bounds() {
    let fx = fixture();
    let cases = [
        (ClauseValue::range(ClauseValue::Null, "10"), "age:[* TO 10]"),
        (ClauseValue::range("5", ClauseValue::Null), "age:[5 TO *]"),
        (ClauseValue::range(ClauseValue::Null, ClauseValue::Null), "age:[* TO *]"),
        (ClauseValue::range(0, 10), "age:[0 TO 10]"),
    ];

    for (value, expected) in cases {
        let mut people = fx.adapter.query();
        people.filter("age__range", value).unwrap();
        assert_eq!(people.compile(), format!("{} AND -deleted:True", expected));
    }
}

/// Test: wildcards wrap the escaped value and are not escaped themselves.
#[test]
fn test_contains_escapes_inside_wildcards() {
    let fx = fixture();
    let mut people = fx.adapter.query();
    people.filter("name__contains", "a b").unwrap();
    assert_eq!(people.compile(), r"name:*a\ b* AND -deleted:True");
}

/// Test: pre-escaped values are inserted untouched.
#[test]
fn test_pre_escaped_value() {
    let fx = fixture();
    let mut people = fx.adapter.query();
    people.filter_escaped("name", "jo*").unwrap();
    assert_eq!(people.compile(), "name:jo* AND -deleted:True");
}

/// Test: escaping an escaped value changes nothing.
#[test]
fn test_escape_never_doubles() {
    for raw in ["a b", "x:y", "(1+1)", "\"quoted\"", "a&&b||c", "what?"] {
        let once = escape_query(raw);
        assert_eq!(escape_query(&once), once);
    }
}

/// Test: search_on ORs one parsed value across fields.
#[test]
fn test_search_on() {
    let fx = fixture();
    let mut people = fx.adapter.query();
    people
        .search_on(&["name", "surname"], Modifier::StartsWith, "jo")
        .unwrap()
        .filter("age", 30)
        .unwrap();
    assert_eq!(
        people.compile(),
        "(name:jo* OR surname:jo*) AND age:30 AND -deleted:True"
    );
}

/// Test: each OR operand is parsed against its own field and escaped.
#[test]
fn test_disjunction_operands_use_declared_types() {
    let fx = fixture();
    let moment = NaiveDate::from_ymd_opt(2015, 3, 4)
        .unwrap()
        .and_hms_opt(10, 20, 30)
        .unwrap();
    let mut people = fx.adapter.query();
    people
        .add_filter([FilterClause::new(
            "OR_QRY",
            ClauseValue::Disjunction(vec![
                ("birth__gte".into(), moment.into()),
                ("name".into(), "abc\\".into()),
            ]),
        )])
        .unwrap()
        .filter("age", 30)
        .unwrap();
    assert_eq!(
        people.compile(),
        r"(birth:[2015\-03\-04T00\:00\:00Z TO *] OR name:abc\\) AND age:30 AND -deleted:True"
    );
}

/// Test: references compile against the `_id` field.
#[test]
fn test_references() {
    let fx = fixture();
    let mut people = fx.adapter.query();
    people
        .filter("employer", ClauseValue::reference("c1"))
        .unwrap()
        .filter("manager", ClauseValue::no_reference())
        .unwrap();
    assert_eq!(
        people.compile(),
        "employer_id:c1 AND -manager_id:[* TO *] AND -deleted:True"
    );
}

/// Test: datetimes on a field declared as a date use the date-only format.
#[test]
fn test_declared_date_field() {
    let fx = fixture();
    let moment = NaiveDate::from_ymd_opt(1990, 5, 17)
        .unwrap()
        .and_hms_opt(13, 45, 0)
        .unwrap();

    let mut people = fx.adapter.query();
    people.filter("birth__lte", moment).unwrap();
    assert_eq!(
        people.compile(),
        r"birth:[* TO 1990\-05\-17T00\:00\:00Z] AND -deleted:True"
    );

    let mut people = fx.adapter.query();
    people.filter("seen__lte", moment).unwrap();
    assert_eq!(
        people.compile(),
        r"seen:[* TO 1990\-05\-17T13\:45\:00Z] AND -deleted:True"
    );
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// Test: multi-field ordering and merged parameters reach the engine.
#[test]
fn test_params_reach_engine() {
    let fx = fixture();
    let mut people = fx.adapter.query();
    people
        .order_by(["name", "-age"])
        .unwrap()
        .set_params([("rows", json!(5)), ("start", json!(10))])
        .unwrap();
    people.execute().unwrap();

    let params = &fx.index.searches()[0].params;
    assert_eq!(params.sort(), Some("name asc, age desc"));
    assert_eq!(params.rows(), Some(5));
    assert_eq!(params.get("start"), Some(&json!(10)));
}
