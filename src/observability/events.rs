//! Observable events
//!
//! Every log line the query layer and write pipeline emit is one of these.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Query
    /// Clause list compiled to a query string
    QueryCompiled,
    /// Search returned
    QueryExecuted,
    /// Search engine rejected the query
    SearchFailed,
    /// A search hit has no backing record yet
    IndexLag,

    // Write
    DocumentCreated,
    DocumentUpdated,
    VersionWritten,
    ActivityLogged,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueryCompiled => "QUERY_COMPILED",
            Event::QueryExecuted => "QUERY_COMPLETE",
            Event::SearchFailed => "SEARCH_FAILED",
            Event::IndexLag => "INDEX_LAG",
            Event::DocumentCreated => "DOCUMENT_CREATED",
            Event::DocumentUpdated => "DOCUMENT_UPDATED",
            Event::VersionWritten => "VERSION_WRITTEN",
            Event::ActivityLogged => "ACTIVITY_LOGGED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryCompiled => Severity::Trace,
            Event::SearchFailed => Severity::Error,
            Event::IndexLag => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
