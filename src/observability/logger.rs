//! JSON-line logger
//!
//! Each event is written as one line of JSON:
//!
//! ```text
//! {"event":"QUERY_COMPLETE","severity":"INFO","hits":"3","index":"models_person","query":"name:john AND -deleted:True"}
//! ```
//!
//! `event` and `severity` lead, the remaining fields follow sorted by name.
//! Writes are synchronous. ERROR goes to stderr, everything else to stdout.

use std::fmt;
use std::io::{self, Write};

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Compiled queries
    Trace,
    Info,
    /// Index lag and abandoned waits
    Warn,
    /// Search failures and failed waits
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Logger;

impl Logger {
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let line = Self::render(severity, event, fields);
        // a lost log line never fails the caller
        let _ = match severity {
            Severity::Error => Self::write_line(&mut io::stderr().lock(), &line),
            _ => Self::write_line(&mut io::stdout().lock(), &line),
        };
    }

    /// Write one rendered line to `writer`
    pub fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }

    /// One log line, trailing newline included
    pub fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut line = format!(
            "{{\"event\":{},\"severity\":\"{}\"",
            quoted(event),
            severity
        );
        for (name, value) in sorted {
            line.push(',');
            line.push_str(&quoted(name));
            line.push(':');
            line.push_str(&quoted(value));
        }
        line.push_str("}\n");
        line
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

/// JSON string literal for `s`, escapes included
fn quoted(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}
