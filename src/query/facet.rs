//! Distinct values of a field, through the engine's faceting endpoint
//!
//! The facet response lists values and counts as one flat array:
//! `{"facet_counts": {"facet_fields": {"city": ["ankara", 3, "izmir", 0]}}}`.
//! Values with a zero count are dropped.

use std::collections::BTreeMap;

use serde_json::Value;

use super::errors::{QueryError, QueryResult};

/// Performs the HTTP GET against the faceting endpoint and returns the body
pub trait FacetFetcher {
    fn fetch(&self, url: &str) -> Result<String, String>;
}

impl<F> FacetFetcher for F
where
    F: Fn(&str) -> Result<String, String>,
{
    fn fetch(&self, url: &str) -> Result<String, String> {
        self(url)
    }
}

/// Facet request URL for `field`, excluding soft-deleted records
pub fn facet_url(endpoint: &str, field: &str) -> String {
    format!(
        "{}?q=-deleted%3ATrue&wt=json&facet=true&facet.field={}",
        endpoint,
        encode_component(field)
    )
}

/// Percent-encode everything outside the RFC 3986 unreserved set
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

/// Parse a facet response body into value -> count
pub fn parse_facet_counts(body: &str, field: &str) -> QueryResult<BTreeMap<String, u64>> {
    let response: Value =
        serde_json::from_str(body).map_err(|e| QueryError::Facet(e.to_string()))?;

    let flat = response
        .get("facet_counts")
        .and_then(|facets| facets.get("facet_fields"))
        .and_then(|fields| fields.get(field))
        .and_then(Value::as_array)
        .ok_or_else(|| QueryError::Facet(format!("no facet counts for field {}", field)))?;

    let mut counts = BTreeMap::new();
    for pair in flat.chunks_exact(2) {
        let value = match &pair[0] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match pair[1].as_u64() {
            Some(0) | None => {}
            Some(count) => {
                counts.insert(value, count);
            }
        }
    }
    Ok(counts)
}
