//! engine
//!
//! The reconciliation core: Inventory -> Measure -> Decide -> Execute.
//!
//! # Architecture
//!
//! Every run follows the same pipeline, whatever the policy:
//!
//! 1. **Validate**: the remote set and primary make sense for the policy
//! 2. **Inventory**: list and fetch every remote's refs (parallel per remote)
//! 3. **Measure**: query ancestry distances (parallel per ref name)
//! 4. **Decide**: pure functions turn measurements into decisions
//! 5. **Execute**: the executor applies the writes (serialized per remote)
//!
//! ```text
//! Validate -> Inventory -> Measure -> Decide -> [announce] -> Execute
//! ```
//!
//! The policy only selects which measure/decide pair runs in steps 3-4.
//!
//! # Invariants
//!
//! - No write is issued before every decision of the run is known
//! - An inventory or distance failure aborts the run before any write
//! - A failed write does not stop writes to other refs or remotes
//! - Every write is announced by an info event before it runs
//!
//! # Example
//!
//! ```
//! use refmesh::core::types::{CommitHash, RefKind, RefName, RemoteName};
//! use refmesh::engine::{reconcile, Policy, ReconcileRequest};
//! use refmesh::git::mock::MockGateway;
//!
//! let a = RemoteName::new("a").unwrap();
//! let b = RemoteName::new("b").unwrap();
//! let v1 = RefName::new("v1").unwrap();
//! let c1 = CommitHash::new("c1").unwrap();
//!
//! let gateway = MockGateway::new()
//!     .with_commit(&c1, &[])
//!     .with_ref(&a, RefKind::Tag, &v1, &c1)
//!     .with_remote(&b);
//!
//! let request = ReconcileRequest::new(Policy::AsymmetricTags, vec![a.clone(), b.clone()])
//!     .with_primary(a);
//! let report = reconcile(&gateway, &request, None).unwrap();
//!
//! assert_eq!(report.applied.len(), 1);
//! assert_eq!(gateway.ref_hash(&b, RefKind::Tag, &v1), Some(c1));
//! ```

pub mod asymmetric;
pub mod distance;
pub mod events;
pub mod exec;
pub mod inventory;
pub mod plan;
pub mod report;
pub mod symmetric;

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::DEFAULT_JOBS;
use crate::core::filter::RefFilter;
use crate::core::types::{RefKind, RemoteName, RemoteSet};
use crate::git::{GatewayError, RepositoryGateway};

pub use events::{Event, EventCollector, EventSink, Severity};
pub use exec::{ExecutionOutcome, Executor, OperationFailure};
pub use plan::{Decision, Operation, OperationAction, Plan};
pub use report::{ReconcileReport, RunId};

use distance::DistanceOracle;
use events::Emitter;

/// Which reconciliation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Branches, no authority; the most advanced remote wins.
    SymmetricBranches,
    /// Branches, the primary remote is authoritative.
    AsymmetricBranches,
    /// Tags, the primary remote is authoritative.
    AsymmetricTags,
}

impl Policy {
    /// The ref namespace this policy works on.
    pub fn kind(self) -> RefKind {
        match self {
            Policy::SymmetricBranches | Policy::AsymmetricBranches => RefKind::Branch,
            Policy::AsymmetricTags => RefKind::Tag,
        }
    }

    /// Check if this policy needs a primary remote.
    pub fn requires_primary(self) -> bool {
        !matches!(self, Policy::SymmetricBranches)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::SymmetricBranches => write!(f, "symmetric branch reconciliation"),
            Policy::AsymmetricBranches => write!(f, "asymmetric branch reconciliation"),
            Policy::AsymmetricTags => write!(f, "asymmetric tag reconciliation"),
        }
    }
}

/// Run-level switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Decide and report, but write nothing
    pub dry_run: bool,
    /// Execute delete decisions
    pub prune: bool,
    /// Worker threads
    pub jobs: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            prune: true,
            jobs: DEFAULT_JOBS,
        }
    }
}

/// Everything a run needs besides the gateway.
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    /// Policy to apply
    pub policy: Policy,
    /// Remotes in tie-break order
    pub remotes: Vec<RemoteName>,
    /// Authoritative remote, for asymmetric policies
    pub primary: Option<RemoteName>,
    /// Ref names in scope
    pub filter: RefFilter,
    /// Run switches
    pub options: ReconcileOptions,
}

impl ReconcileRequest {
    /// A request over all refs with default options.
    pub fn new(policy: Policy, remotes: Vec<RemoteName>) -> Self {
        Self {
            policy,
            remotes,
            primary: None,
            filter: RefFilter::accept_all(),
            options: ReconcileOptions::default(),
        }
    }

    /// Set the authoritative remote.
    pub fn with_primary(mut self, primary: RemoteName) -> Self {
        self.primary = Some(primary);
        self
    }

    /// Restrict the ref names in scope.
    pub fn with_filter(mut self, filter: RefFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set run switches.
    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// Check the request without contacting any remote.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::InvalidConfiguration`] with the same message
    /// [`reconcile`] would fail with.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        validate(self).map(|_| ())
    }
}

/// Errors from a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The request cannot be run; nothing was contacted.
    #[error("{message}")]
    InvalidConfiguration {
        /// What is wrong
        message: String,
    },

    /// Listing, fetching or measuring failed; nothing was written.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The worker pool could not be started.
    #[error("failed to start worker pool: {message}")]
    WorkerPool {
        /// Underlying error
        message: String,
    },

    /// Some writes failed; all others were attempted.
    #[error("{} operation(s) failed", .failures.len())]
    OperationsFailed {
        /// The failed writes
        failures: Vec<OperationFailure>,
        /// The full run record
        report: Box<ReconcileReport>,
    },
}

impl ReconcileError {
    fn invalid(message: impl Into<String>) -> Self {
        ReconcileError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// The run record, if the run got as far as executing.
    pub fn report(&self) -> Option<&ReconcileReport> {
        match self {
            ReconcileError::OperationsFailed { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Validate remotes and primary against the policy.
///
/// Returns the remote set and the authority (for asymmetric policies).
fn validate(request: &ReconcileRequest) -> Result<(RemoteSet, Option<RemoteName>), ReconcileError> {
    let remotes = RemoteSet::new(request.remotes.iter().cloned())
        .map_err(|e| ReconcileError::invalid(e.to_string()))?;

    match (&request.primary, request.policy.requires_primary()) {
        (Some(_), false) => Err(ReconcileError::invalid(format!(
            "{} does not take a primary remote",
            request.policy
        ))),
        (None, true) => Err(ReconcileError::invalid(format!(
            "{} requires a primary remote",
            request.policy
        ))),
        (Some(primary), true) if !remotes.contains(primary) => {
            Err(ReconcileError::invalid(format!(
                "primary remote {} is not part of the synchronized remotes list {}",
                primary, remotes
            )))
        }
        (primary, _) => Ok((remotes, primary.clone())),
    }
}

/// Run one reconciliation.
///
/// Events are forwarded to `sink` as they happen and are also returned in
/// the report.
///
/// # Errors
///
/// - [`ReconcileError::InvalidConfiguration`] before contacting any remote
/// - [`ReconcileError::Gateway`] if the inventory or a distance query fails
/// - [`ReconcileError::OperationsFailed`] if any write failed
pub fn reconcile<G>(
    gateway: &G,
    request: &ReconcileRequest,
    sink: Option<&dyn EventSink>,
) -> Result<ReconcileReport, ReconcileError>
where
    G: RepositoryGateway + ?Sized,
{
    let (remotes, authority) = validate(request)?;
    let policy = request.policy;
    let kind = policy.kind();
    let options = request.options;
    let mut report = ReconcileReport::new(policy, options.dry_run);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.max(1))
        .thread_name(|i| format!("refmesh-{i}"))
        .build()
        .map_err(|e| ReconcileError::WorkerPool {
            message: e.to_string(),
        })?;

    info!(%policy, %remotes, primary = ?authority.as_ref().map(RemoteName::as_str), "reconcile");

    let table = inventory::build(gateway, &remotes, kind, &request.filter, &pool)?;
    let oracle = DistanceOracle::new(gateway);

    let plan = match &authority {
        None => {
            let measurements = symmetric::measure(&table, &oracle, &pool)?;
            symmetric::plan(&remotes, &measurements)
        }
        Some(authority) => {
            let measurements = asymmetric::measure(&table, authority, &oracle, &pool)?;
            asymmetric::plan(kind, authority, &measurements)
        }
    };
    debug!(decisions = plan.decisions.len(), queries = oracle.queries(), "decided");

    let emitter = Emitter::new(sink);
    for decision in &plan.decisions {
        if let Some(event) = decision.event(kind) {
            emitter.emit(event);
        }
    }

    let (runnable, skipped): (Vec<Operation>, Vec<Operation>) = plan
        .operations()
        .into_iter()
        .partition(|op| !options.dry_run && (options.prune || !op.is_delete()));
    if !skipped.is_empty() {
        debug!(count = skipped.len(), dry_run = options.dry_run, "skipping operations");
    }

    let outcome = Executor::new(gateway).execute(&runnable, &pool, &emitter);

    report.decisions = plan.decisions;
    report.applied = outcome.applied;
    report.skipped = skipped;
    report.failed = outcome.failures;
    report.events = emitter.into_events();

    if !report.failed.is_empty() {
        return Err(ReconcileError::OperationsFailed {
            failures: report.failed.clone(),
            report: Box::new(report),
        });
    }

    Ok(report)
}
