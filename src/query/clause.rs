//! Filter clause structures
//!
//! A clause is `(key, value, pre_escaped)`. Keys may end in a modifier suffix
//! (`name__contains`); values are tagged by the caller rather than guessed at.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Query modifiers, written as `__<name>` key suffixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Exact,
    Contains,
    StartsWith,
    EndsWith,
    Range,
    Lte,
    Gte,
    In,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Exact => "exact",
            Modifier::Contains => "contains",
            Modifier::StartsWith => "startswith",
            Modifier::EndsWith => "endswith",
            Modifier::Range => "range",
            Modifier::Lte => "lte",
            Modifier::Gte => "gte",
            Modifier::In => "in",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "exact" => Some(Modifier::Exact),
            "contains" => Some(Modifier::Contains),
            "startswith" => Some(Modifier::StartsWith),
            "endswith" => Some(Modifier::EndsWith),
            "range" => Some(Modifier::Range),
            "lte" => Some(Modifier::Lte),
            "gte" => Some(Modifier::Gte),
            "in" => Some(Modifier::In),
            _ => None,
        }
    }

    /// Split a recognised modifier suffix off `key`.
    ///
    /// `"age__gte"` gives `("age", Some(Gte))`; `"address__city"` is a nested
    /// field, not a modifier, and comes back whole.
    pub fn split_key(key: &str) -> (&str, Option<Modifier>) {
        if let Some(pos) = key.rfind("__") {
            if let Some(modifier) = Modifier::parse(&key[pos + 2..]) {
                return (&key[..pos], Some(modifier));
            }
        }
        (key, None)
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value side of a clause
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseValue {
    /// Scalar JSON value: string, number or bool
    Literal(Value),
    /// Matches records where the field is empty
    Null,
    /// Linked record, by key; `None` matches records without a link
    Reference(Option<String>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Values of an `__in` clause (also accepted as range bounds)
    Sequence(Vec<ClauseValue>),
    /// `[start TO end]`; a `Null` bound is open
    Range(Box<ClauseValue>, Box<ClauseValue>),
    /// `(key, value)` operands OR-ed together; each key may carry its own
    /// modifier and is compiled like a clause of its own
    Disjunction(Vec<(String, ClauseValue)>),
}

impl ClauseValue {
    /// Link to the record at `key`
    pub fn reference(key: impl Into<String>) -> Self {
        ClauseValue::Reference(Some(key.into()))
    }

    /// Records with no link
    pub fn no_reference() -> Self {
        ClauseValue::Reference(None)
    }

    pub fn range(start: impl Into<ClauseValue>, end: impl Into<ClauseValue>) -> Self {
        ClauseValue::Range(Box::new(start.into()), Box::new(end.into()))
    }

    pub fn sequence<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ClauseValue>,
    {
        ClauseValue::Sequence(values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ClauseValue::Null)
    }

    /// Null, or an empty string; such range bounds are left open
    pub fn is_open_bound(&self) -> bool {
        match self {
            ClauseValue::Null => true,
            ClauseValue::Literal(Value::Null) => true,
            ClauseValue::Literal(Value::String(s)) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<Value> for ClauseValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ClauseValue::Null,
            Value::Array(items) => ClauseValue::sequence(items),
            other => ClauseValue::Literal(other),
        }
    }
}

impl From<&str> for ClauseValue {
    fn from(value: &str) -> Self {
        ClauseValue::Literal(Value::String(value.to_string()))
    }
}

impl From<String> for ClauseValue {
    fn from(value: String) -> Self {
        ClauseValue::Literal(Value::String(value))
    }
}

impl From<bool> for ClauseValue {
    fn from(value: bool) -> Self {
        ClauseValue::Literal(Value::Bool(value))
    }
}

impl From<i64> for ClauseValue {
    fn from(value: i64) -> Self {
        ClauseValue::Literal(Value::from(value))
    }
}

impl From<i32> for ClauseValue {
    fn from(value: i32) -> Self {
        ClauseValue::Literal(Value::from(value))
    }
}

impl From<u64> for ClauseValue {
    fn from(value: u64) -> Self {
        ClauseValue::Literal(Value::from(value))
    }
}

impl From<f64> for ClauseValue {
    fn from(value: f64) -> Self {
        ClauseValue::from(Value::from(value))
    }
}

impl From<NaiveDate> for ClauseValue {
    fn from(value: NaiveDate) -> Self {
        ClauseValue::Date(value)
    }
}

impl From<NaiveDateTime> for ClauseValue {
    fn from(value: NaiveDateTime) -> Self {
        ClauseValue::DateTime(value)
    }
}

impl<T: Into<ClauseValue>> From<Option<T>> for ClauseValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ClauseValue::Null)
    }
}

/// One filter unit
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub key: String,
    pub value: ClauseValue,
    /// Value is already escaped; the compiler inserts it as is
    pub escaped: bool,
}

impl FilterClause {
    pub fn new(key: impl Into<String>, value: impl Into<ClauseValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            escaped: false,
        }
    }

    pub fn escaped(key: impl Into<String>, value: impl Into<ClauseValue>) -> Self {
        Self {
            escaped: true,
            ..Self::new(key, value)
        }
    }
}

impl<K: Into<String>, V: Into<ClauseValue>> From<(K, V)> for FilterClause {
    fn from((key, value): (K, V)) -> Self {
        FilterClause::new(key, value)
    }
}

impl<K: Into<String>, V: Into<ClauseValue>> From<(K, V, bool)> for FilterClause {
    fn from((key, value, escaped): (K, V, bool)) -> Self {
        FilterClause {
            escaped,
            ..FilterClause::new(key, value)
        }
    }
}
