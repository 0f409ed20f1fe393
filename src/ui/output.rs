//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, stdout carries only the JSON report; alerts
//! still go to stderr.

use std::fmt::Display;
use std::io::Write;

use crate::core::types::RefKind;
use crate::engine::{Event, EventSink, ReconcileReport, Severity};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - alerts and errors only
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Format an event as a single console line.
///
/// # Example
///
/// ```
/// use refmesh::core::types::{RefKind, RefName, RemoteName};
/// use refmesh::engine::Event;
/// use refmesh::ui::output::format_event;
///
/// let event = Event::alert(
///     RefKind::Branch,
///     RefName::new("develop").unwrap(),
///     vec![RemoteName::new("a").unwrap()],
///     "Branch a/develop h2 is 1 commits ahead b/develop h1",
/// );
/// assert_eq!(
///     format_event(&event),
///     "ALERT Branch a/develop h2 is 1 commits ahead b/develop h1"
/// );
/// ```
pub fn format_event(event: &Event) -> String {
    match event.severity {
        Severity::Info => event.message.clone(),
        Severity::Alert => format!("ALERT {}", event.message),
    }
}

fn plural(kind: RefKind) -> &'static str {
    match kind {
        RefKind::Branch => "branches",
        RefKind::Tag => "tags",
    }
}

/// One-line summary of a finished run.
pub fn format_summary(report: &ReconcileReport) -> String {
    let alerts = report.alert_count();
    let kind = plural(report.kind);
    let mut summary = if report.is_converged() {
        format!("{}: in sync", kind)
    } else if report.dry_run {
        format!(
            "{}: {} operation(s) planned (dry run)",
            kind,
            report.skipped.len()
        )
    } else {
        format!("{}: {} operation(s) applied", kind, report.applied.len())
    };

    if !report.dry_run && !report.skipped.is_empty() {
        summary.push_str(&format!(", {} skipped", report.skipped.len()));
    }
    if alerts > 0 {
        summary.push_str(&format!(", {} alert(s)", alerts));
    }
    summary
}

/// Event sink that renders events on the terminal as they happen.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    verbosity: Verbosity,
    json: bool,
}

impl ConsoleSink {
    /// Create a console sink.
    ///
    /// In JSON mode info events are not printed; stdout is reserved for
    /// the report.
    pub fn new(verbosity: Verbosity, json: bool) -> Self {
        Self { verbosity, json }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: &Event) {
        match event.severity {
            Severity::Alert => {
                let mut stderr = std::io::stderr().lock();
                let _ = writeln!(stderr, "{}", format_event(event));
            }
            Severity::Info if !self.json && self.verbosity != Verbosity::Quiet => {
                let mut stdout = std::io::stdout().lock();
                let _ = writeln!(stdout, "{}", format_event(event));
            }
            Severity::Info => {}
        }
    }
}
