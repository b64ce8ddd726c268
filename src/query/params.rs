//! Sort specification and default search parameters

use std::fmt;

use crate::store::QueryParameters;

/// Sort applied when the caller gives none
pub const DEFAULT_SORT: &str = "timestamp desc";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// `-field` sorts descending, anything else ascending
    pub fn parse(field: &str) -> Self {
        match field.strip_prefix('-') {
            Some(name) => Self::desc(name),
            None => Self::asc(field),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_str())
    }
}

/// Render an ordering as the engine's `sort` parameter
pub fn sort_param<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| SortSpec::parse(f.as_ref()).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parameters every new query starts with
pub fn default_params() -> QueryParameters {
    let mut params = QueryParameters::new();
    params.set("sort", DEFAULT_SORT);
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_direction() {
        assert_eq!(SortSpec::parse("-timestamp"), SortSpec::desc("timestamp"));
        assert_eq!(SortSpec::parse("name"), SortSpec::asc("name"));
    }

    #[test]
    fn test_sort_param_joined() {
        assert_eq!(sort_param(["-timestamp"]), "timestamp desc");
        assert_eq!(sort_param(vec!["name", "-age"]), "name asc, age desc");
    }

    #[test]
    fn test_default_params() {
        let params = default_params();
        assert_eq!(params.sort(), Some(DEFAULT_SORT));
        assert!(params.rows().is_none());
    }
}
