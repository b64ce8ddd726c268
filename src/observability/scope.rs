//! Begin/end logging around blocking waits
//!
//! The batch barrier and bucket clear both poll the index until it agrees
//! with the store. A scope logs when such a wait starts and how it ended:
//!
//! - `{name}_BEGIN` on creation
//! - `{name}_COMPLETE` with `polls` and `elapsed_ms` on `complete()`
//! - `{name}_FAILED` with the reason on `fail()`
//! - `{name}_INCOMPLETE` if dropped without either

use std::cell::Cell;
use std::time::Instant;

use super::logger::Logger;

/// ```ignore
/// let scope = ObservationScope::with_fields("BATCH_WAIT", &[("pending", "3")]);
/// while !caught_up()? {
///     scope.poll();
/// }
/// scope.complete();
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    fields: Vec<(&'a str, String)>,
    polls: Cell<u32>,
    finished: Cell<bool>,
    timer: Timer,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Logs `{name}_BEGIN`; `fields` are repeated on every later line
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);
        Self {
            name,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            polls: Cell::new(0),
            finished: Cell::new(false),
            timer: Timer::new(),
        }
    }

    /// Count one poll of the index
    pub fn poll(&self) -> u32 {
        let polls = self.polls.get() + 1;
        self.polls.set(polls);
        polls
    }

    pub fn polls(&self) -> u32 {
        self.polls.get()
    }

    pub fn complete(self) {
        self.finished.set(true);
        let polls = self.polls.get().to_string();
        let elapsed = self.timer.elapsed_ms();
        self.emit_info(
            "COMPLETE",
            &[("elapsed_ms", elapsed.as_str()), ("polls", polls.as_str())],
        );
    }

    pub fn fail(self, reason: &str) {
        self.finished.set(true);
        let polls = self.polls.get().to_string();
        let mut fields = self.scope_fields();
        fields.push(("polls", polls.as_str()));
        fields.push(("reason", reason));
        Logger::error(&format!("{}_FAILED", self.name), &fields);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    fn scope_fields(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    fn emit_info(&self, suffix: &str, extra: &[(&str, &str)]) {
        let mut fields = self.scope_fields();
        fields.extend_from_slice(extra);
        Logger::info(&format!("{}_{}", self.name, suffix), &fields);
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.finished.get() {
            let polls = self.polls.get().to_string();
            let mut fields = self.scope_fields();
            fields.push(("polls", polls.as_str()));
            Logger::warn(&format!("{}_INCOMPLETE", self.name), &fields);
        }
    }
}

/// Wall-clock time since creation
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
