//! engine::report
//!
//! The record of one reconciliation run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::events::Event;
use super::exec::OperationFailure;
use super::plan::{Decision, Operation, Plan};
use super::Policy;
use crate::core::types::RefKind;

/// Unique identifier of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a run decided and did.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    /// Run identifier
    pub run_id: RunId,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Namespace reconciled
    pub kind: RefKind,
    /// Policy applied
    pub policy: Policy,
    /// Whether writes were suppressed
    pub dry_run: bool,
    /// Every decision, grouped by ref name
    pub decisions: Vec<Decision>,
    /// Operations carried out
    pub applied: Vec<Operation>,
    /// Operations decided but not carried out (dry run, prune disabled)
    pub skipped: Vec<Operation>,
    /// Operations the gateway refused
    pub failed: Vec<OperationFailure>,
    /// Diagnostic events, in emission order
    pub events: Vec<Event>,
}

impl ReconcileReport {
    pub(crate) fn new(policy: Policy, dry_run: bool) -> Self {
        Self {
            run_id: RunId::new(),
            started_at: Utc::now(),
            kind: policy.kind(),
            policy,
            dry_run,
            decisions: Vec::new(),
            applied: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            events: Vec::new(),
        }
    }

    /// The writes the decisions call for, whether or not they ran.
    pub fn operations(&self) -> Vec<Operation> {
        self.plan().operations()
    }

    /// The decisions as a plan.
    pub fn plan(&self) -> Plan {
        Plan {
            kind: self.kind,
            decisions: self.decisions.clone(),
        }
    }

    /// True when the remotes needed no writes.
    pub fn is_converged(&self) -> bool {
        self.decisions.iter().all(|d| d.target().is_none())
    }

    /// Number of alert events.
    pub fn alert_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_alert()).count()
    }

    /// Decisions that need a human.
    pub fn conflicts(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|d| d.is_alert())
    }
}
