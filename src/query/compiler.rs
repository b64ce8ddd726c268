//! Query compiler
//!
//! Turns an ordered clause list into a Solr query string.
//!
//! # Per clause (strict order)
//!
//! 1. `key` aliases to the row key field
//! 2. Split the modifier suffix off the key
//! 3. Dispatch on the value: reference, `__in`, null, scalar
//!    (a disjunction runs every operand through these steps on its own)
//! 4. Render and escape the scalar, then apply the modifier
//! 5. Rewrite remaining `__` in the field name to `.`
//!
//! Afterwards the deleted-record exclusion is appended unless a clause
//! mentions `deleted`, and everything is AND-joined.

use serde_json::Value;

use crate::model::{FieldMap, SolrType};
use crate::store::ROW_KEY_FIELD;

use super::clause::{ClauseValue, FilterClause, Modifier};
use super::escape::{escape_query, escape_unless};

/// Date-only format, indexed at midnight UTC
pub const DATE_FORMAT: &str = "%Y-%m-%dT00:00:00Z";

/// Full timestamp format
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Soft-delete flag field
pub const DELETED_FIELD: &str = "deleted";

/// Clause appended when the caller did not ask about deleted records
pub const EXCLUDE_DELETED: &str = "-deleted:True";

/// Query matching every record
pub const MATCH_ALL: &str = "*:*";

/// Group matching no record, for an empty `__in`
pub const MATCH_NONE: &str = "*:* AND -*:*";

/// A compiled clause before joining
#[derive(Debug, Clone, PartialEq)]
enum Compiled {
    Term { field: String, value: String },
    /// Already combined `a:x OR b:y`; rendered in parentheses
    Group(String),
}

impl Compiled {
    fn render(self) -> String {
        match self {
            Compiled::Term { field, value } => format!("{}:{}", field, value),
            Compiled::Group(body) => format!("({})", body),
        }
    }
}

/// Compiles clause lists against a model's declared fields
pub struct QueryCompiler<'a> {
    fields: &'a FieldMap,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(fields: &'a FieldMap) -> Self {
        Self { fields }
    }

    /// Compile `clauses` into one query string
    pub fn compile(&self, clauses: &[FilterClause]) -> String {
        let mut parts = Vec::with_capacity(clauses.len() + 1);
        let mut wants_deleted = false;

        for clause in clauses {
            let (compiled, mentions_deleted) = self.compile_clause(clause);
            wants_deleted |= mentions_deleted;
            parts.push(compiled.render());
        }

        if !wants_deleted {
            parts.push(EXCLUDE_DELETED.to_string());
        }

        let joined = parts.join(" AND ");
        if joined.is_empty() {
            MATCH_ALL.to_string()
        } else {
            joined
        }
    }

    /// Returns the compiled clause and whether it addresses the deleted flag
    fn compile_clause(&self, clause: &FilterClause) -> (Compiled, bool) {
        self.compile_term(&clause.key, &clause.value, clause.escaped)
    }

    fn compile_term(&self, key: &str, value: &ClauseValue, escaped: bool) -> (Compiled, bool) {
        if let ClauseValue::Disjunction(pairs) = value {
            let mut mentions_deleted = false;
            let body = pairs
                .iter()
                .map(|(key, value)| {
                    let (operand, mentions) = self.compile_term(key, value, escaped);
                    mentions_deleted |= mentions;
                    operand.render()
                })
                .collect::<Vec<_>>()
                .join(" OR ");
            return (Compiled::Group(body), mentions_deleted);
        }

        let key = alias_key(key);
        let (field, modifier) = Modifier::split_key(&key);
        let mentions_deleted = field.trim_start_matches('-') == DELETED_FIELD;
        let declared = self.fields.solr_type(field);

        let compiled = match (value, modifier) {
            (ClauseValue::Reference(None), _) => not_exists(&format!("{}_id", field)),
            (ClauseValue::Reference(Some(target)), modifier) => Compiled::Term {
                field: dotted(&format!("{}_id", field)),
                value: apply_modifier(
                    modifier,
                    &ClauseValue::from(target.as_str()),
                    escaped,
                    None,
                ),
            },
            (value, Some(Modifier::In)) => {
                let items = match value {
                    ClauseValue::Sequence(items) => items.clone(),
                    single => vec![single.clone()],
                };
                in_group(field, &items, escaped, declared)
            }
            (ClauseValue::Null, _) => not_exists(field),
            (value, modifier) => Compiled::Term {
                field: dotted(field),
                value: apply_modifier(modifier, value, escaped, declared),
            },
        };

        (compiled, mentions_deleted)
    }
}

/// `key` and `key__<modifier>` address the row key
fn alias_key(key: &str) -> String {
    if key == "key" {
        ROW_KEY_FIELD.to_string()
    } else if let Some(rest) = key.strip_prefix("key__") {
        format!("{}__{}", ROW_KEY_FIELD, rest)
    } else {
        key.to_string()
    }
}

/// Nested field addressing: `address__city` -> `address.city`
fn dotted(field: &str) -> String {
    field.replace("__", ".")
}

/// `-field:[* TO *]`, never with a doubled negation
fn not_exists(field: &str) -> Compiled {
    let field = dotted(field);
    let field = match field.strip_prefix('-') {
        Some(rest) => rest.to_string(),
        None => field,
    };
    Compiled::Term {
        field: format!("-{}", field),
        value: "[* TO *]".to_string(),
    }
}

fn in_group(
    field: &str,
    items: &[ClauseValue],
    escaped: bool,
    declared: Option<SolrType>,
) -> Compiled {
    if items.is_empty() {
        return Compiled::Group(MATCH_NONE.to_string());
    }
    let field = dotted(field);
    let body = items
        .iter()
        .map(|item| {
            let value = render_scalar(item, declared).unwrap_or_default();
            format!("{}:{}", field, escape_unless(&value, escaped))
        })
        .collect::<Vec<_>>()
        .join(" OR ");
    Compiled::Group(body)
}

/// Render a scalar clause value as query text; `None` for null
pub fn render_scalar(value: &ClauseValue, declared: Option<SolrType>) -> Option<String> {
    match value {
        ClauseValue::Null => None,
        ClauseValue::Literal(v) => render_json(v),
        ClauseValue::Reference(key) => key.clone(),
        ClauseValue::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
        ClauseValue::DateTime(dt) => Some(match declared {
            Some(SolrType::Date) => dt.date().format(DATE_FORMAT).to_string(),
            _ => dt.format(DATE_TIME_FORMAT).to_string(),
        }),
        ClauseValue::Sequence(items) => Some(
            items
                .iter()
                .filter_map(|item| render_scalar(item, declared))
                .collect::<Vec<_>>()
                .join(" "),
        ),
        ClauseValue::Range(start, end) => Some(format!(
            "{} {}",
            render_scalar(start, declared).unwrap_or_default(),
            render_scalar(end, declared).unwrap_or_default()
        )),
        ClauseValue::Disjunction(pairs) => Some(
            pairs
                .iter()
                .filter_map(|(_, v)| render_scalar(v, declared))
                .collect::<Vec<_>>()
                .join(" "),
        ),
    }
}

fn render_json(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Render `value` and transform it by `modifier`.
///
/// The value is escaped first (unless pre-escaped); wildcards and range
/// brackets are added afterwards and are never escaped.
pub fn apply_modifier(
    modifier: Option<Modifier>,
    value: &ClauseValue,
    escaped: bool,
    declared: Option<SolrType>,
) -> String {
    if modifier == Some(Modifier::Range) {
        let (start, end) = range_bounds(value);
        let start = bound_text(start, escaped, declared);
        let end = bound_text(end, escaped, declared);
        return format!("[{} TO {}]", start, end);
    }

    let text = render_scalar(value, declared).unwrap_or_default();
    let text = escape_unless(&text, escaped);

    match modifier {
        None | Some(Modifier::Exact) | Some(Modifier::In) | Some(Modifier::Range) => text,
        Some(Modifier::Contains) => format!("*{}*", text),
        Some(Modifier::StartsWith) => format!("{}*", text),
        Some(Modifier::EndsWith) => format!("*{}", text),
        Some(Modifier::Lte) => format!("[* TO {}]", text),
        Some(Modifier::Gte) => format!("[{} TO *]", text),
    }
}

fn range_bounds(value: &ClauseValue) -> (Option<&ClauseValue>, Option<&ClauseValue>) {
    match value {
        ClauseValue::Range(start, end) => (Some(start.as_ref()), Some(end.as_ref())),
        ClauseValue::Sequence(items) => (items.first(), items.get(1)),
        single => (Some(single), None),
    }
}

fn bound_text(bound: Option<&ClauseValue>, escaped: bool, declared: Option<SolrType>) -> String {
    match bound {
        Some(b) if !b.is_open_bound() => {
            let text = render_scalar(b, declared).unwrap_or_default();
            if escaped {
                text
            } else {
                escape_query(&text)
            }
        }
        _ => "*".to_string(),
    }
}
