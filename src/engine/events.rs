//! engine::events
//!
//! Diagnostic events emitted by a reconciliation run.
//!
//! Events are data, not log lines. Every state-changing decision produces
//! an info event before anything is pushed, and every conflict or failure
//! produces an alert. Events are handed to an optional [`EventSink`] as
//! they happen and are also returned in the run report.
//!
//! # Example
//!
//! ```
//! use refmesh::engine::events::{Event, EventCollector, EventSink, Severity};
//! use refmesh::core::types::{RefKind, RefName, RemoteName};
//!
//! let collector = EventCollector::new();
//! collector.emit(&Event::alert(
//!     RefKind::Branch,
//!     RefName::new("develop").unwrap(),
//!     vec![RemoteName::new("a").unwrap(), RemoteName::new("b").unwrap()],
//!     "diverged",
//! ));
//!
//! assert_eq!(collector.events()[0].severity, Severity::Alert);
//! ```

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::core::types::{RefKind, RefName, RemoteName};

/// How loudly an event should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Routine progress: a push or delete about to happen.
    Info,
    /// Needs a human: diverged history, unpushed work, failed operation.
    Alert,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Alert => write!(f, "alert"),
        }
    }
}

/// A diagnostic record about one ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Event severity
    pub severity: Severity,
    /// Namespace of the ref
    pub kind: RefKind,
    /// The ref the event is about
    pub ref_name: RefName,
    /// Remotes involved, target first
    pub remotes: Vec<RemoteName>,
    /// Human-readable message
    pub message: String,
}

impl Event {
    /// Create an info event.
    pub fn info(
        kind: RefKind,
        ref_name: RefName,
        remotes: Vec<RemoteName>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Info,
            kind,
            ref_name,
            remotes,
            message: message.into(),
        }
    }

    /// Create an alert event.
    pub fn alert(
        kind: RefKind,
        ref_name: RefName,
        remotes: Vec<RemoteName>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Alert,
            ..Self::info(kind, ref_name, remotes, message)
        }
    }

    /// Check if this event needs attention.
    pub fn is_alert(&self) -> bool {
        self.severity == Severity::Alert
    }
}

/// Receiver for events as they are produced.
///
/// Called from worker threads during execution, hence `Send + Sync`.
pub trait EventSink: Send + Sync {
    /// Handle one event.
    fn emit(&self, event: &Event);
}

/// A sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Mutex<Vec<Event>>,
}

impl EventCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected events, in emission order.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take the collected events, leaving the collector empty.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for EventCollector {
    fn emit(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Records events for the report and forwards them to the caller's sink.
pub(crate) struct Emitter<'a> {
    sink: Option<&'a dyn EventSink>,
    recorded: EventCollector,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(sink: Option<&'a dyn EventSink>) -> Self {
        Self {
            sink,
            recorded: EventCollector::new(),
        }
    }

    pub(crate) fn emit(&self, event: Event) {
        match event.severity {
            Severity::Info => tracing::info!(kind = %event.kind, name = %event.ref_name, "{}", event.message),
            Severity::Alert => tracing::warn!(kind = %event.kind, name = %event.ref_name, "{}", event.message),
        }
        if let Some(sink) = self.sink {
            sink.emit(&event);
        }
        self.recorded.emit(&event);
    }

    pub(crate) fn into_events(self) -> Vec<Event> {
        self.recorded.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(severity: Severity) -> Event {
        let event = Event::info(
            RefKind::Tag,
            RefName::new("v1").unwrap(),
            vec![RemoteName::new("backup").unwrap()],
            "Update backup:refs/tags/v1 => origin:abc",
        );
        Event { severity, ..event }
    }

    #[test]
    fn emitter_forwards_and_records() {
        let sink = EventCollector::new();
        let emitter = Emitter::new(Some(&sink));
        emitter.emit(sample(Severity::Info));
        emitter.emit(sample(Severity::Alert));

        assert_eq!(sink.events().len(), 2);
        let recorded = emitter.into_events();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[1].is_alert());
    }

    #[test]
    fn collector_take_drains() {
        let collector = EventCollector::new();
        collector.emit(&sample(Severity::Info));
        assert_eq!(collector.take().len(), 1);
        assert!(collector.events().is_empty());
    }

    #[test]
    fn emitter_without_sink_still_records() {
        let emitter = Emitter::new(None);
        emitter.emit(sample(Severity::Info));
        assert_eq!(emitter.into_events().len(), 1);
    }

    #[test]
    fn serializes_severity_in_snake_case() {
        let json = serde_json::to_value(sample(Severity::Alert)).unwrap();
        assert_eq!(json["severity"], "alert");
        assert_eq!(json["kind"], "tag");
        assert_eq!(json["ref_name"], "v1");
    }
}
