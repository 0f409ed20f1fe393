//! engine::exec
//!
//! The single executor for remote writes.
//!
//! # Architecture
//!
//! The executor is the ONLY component that pushes to or deletes from a
//! remote. It receives operations already derived from a complete set of
//! decisions.
//!
//! # Executor Contract
//!
//! 1. Group operations by target remote, keeping decision order
//! 2. Run each group sequentially; a remote never sees concurrent writes
//! 3. Run different groups concurrently on the worker pool
//! 4. Keep going after a failure; report every failure at the end
//!
//! # Example
//!
//! ```ignore
//! use refmesh::engine::exec::Executor;
//!
//! let executor = Executor::new(&gateway);
//! let outcome = executor.execute(&plan.operations(), &pool, &emitter);
//! if !outcome.is_success() {
//!     for failure in &outcome.failures {
//!         eprintln!("{}: {}", failure.operation.description(), failure.error);
//!     }
//! }
//! ```

use rayon::prelude::*;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use super::events::{Emitter, Event};
use super::plan::{Operation, OperationAction};
use crate::core::types::RemoteName;
use crate::git::{GatewayError, RepositoryGateway};

/// An operation the gateway refused or could not carry out.
#[derive(Debug, Clone, Serialize)]
pub struct OperationFailure {
    /// The operation that failed
    pub operation: Operation,
    /// Why it failed
    #[serde(serialize_with = "serialize_display")]
    pub error: GatewayError,
}

fn serialize_display<S: Serializer>(error: &GatewayError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Result of executing a batch of operations.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// Operations that succeeded, grouped by remote
    pub applied: Vec<Operation>,
    /// Operations that failed, grouped by remote
    pub failures: Vec<OperationFailure>,
}

impl ExecutionOutcome {
    /// Check if every operation succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The executor.
pub struct Executor<'g, G: ?Sized> {
    gateway: &'g G,
}

impl<'g, G> Executor<'g, G>
where
    G: RepositoryGateway + ?Sized,
{
    /// Create an executor over a gateway.
    pub fn new(gateway: &'g G) -> Self {
        Self { gateway }
    }

    /// Execute operations, serialized per remote.
    pub(crate) fn execute(
        &self,
        operations: &[Operation],
        pool: &rayon::ThreadPool,
        emitter: &Emitter<'_>,
    ) -> ExecutionOutcome {
        let groups = group_by_remote(operations);

        let results: Vec<ExecutionOutcome> = pool.install(|| {
            groups
                .par_iter()
                .map(|(_, group)| self.execute_group(group, emitter))
                .collect()
        });

        results
            .into_iter()
            .fold(ExecutionOutcome::default(), |mut all, outcome| {
                all.applied.extend(outcome.applied);
                all.failures.extend(outcome.failures);
                all
            })
    }

    fn execute_group(&self, group: &[&Operation], emitter: &Emitter<'_>) -> ExecutionOutcome {
        let mut outcome = ExecutionOutcome::default();
        for operation in group {
            match self.apply(operation) {
                Ok(()) => {
                    info!(operation = %operation.description(), "applied");
                    outcome.applied.push((*operation).clone());
                }
                Err(error) => {
                    warn!(operation = %operation.description(), %error, "failed");
                    emitter.emit(Event::alert(
                        operation.kind,
                        operation.name.clone(),
                        vec![operation.remote.clone()],
                        format!("Failed {}: {}", operation.description(), error),
                    ));
                    outcome.failures.push(OperationFailure {
                        operation: (*operation).clone(),
                        error,
                    });
                }
            }
        }
        outcome
    }

    fn apply(&self, operation: &Operation) -> Result<(), GatewayError> {
        match &operation.action {
            OperationAction::Push { hash, force } => self.gateway.push(
                &operation.remote,
                operation.kind,
                &operation.name,
                hash,
                *force,
            ),
            OperationAction::Delete => {
                self.gateway
                    .delete_ref(&operation.remote, operation.kind, &operation.name)
            }
        }
    }
}

/// Group operations by remote in first-appearance order.
fn group_by_remote(operations: &[Operation]) -> Vec<(RemoteName, Vec<&Operation>)> {
    let mut groups: Vec<(RemoteName, Vec<&Operation>)> = Vec::new();
    for operation in operations {
        match groups.iter_mut().find(|(remote, _)| *remote == operation.remote) {
            Some((_, group)) => group.push(operation),
            None => groups.push((operation.remote.clone(), vec![operation])),
        }
    }
    groups
}
