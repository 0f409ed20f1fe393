//! engine::plan
//!
//! Convergence decisions and the operations derived from them.
//!
//! # Architecture
//!
//! Decisions are the sole intermediate representation between the frozen
//! inventory and any remote mutation. They are:
//! - **Deterministic**: the same inventory and distances give the same decisions
//! - **Previewable**: every decision renders to a message before execution
//! - **Serializable**: decisions and operations appear in the JSON report
//!
//! # Invariants
//!
//! - Building decisions performs no I/O
//! - Only `Converge`, `Create` and `Delete` produce operations
//! - Branch pushes are never forced; tag pushes always are
//!
//! # Example
//!
//! ```
//! use refmesh::core::types::{CommitHash, RefKind, RefName, RemoteName};
//! use refmesh::engine::plan::{Decision, Plan};
//!
//! let plan = Plan::new(RefKind::Tag).with_decision(Decision::Delete {
//!     target: RemoteName::new("backup").unwrap(),
//!     name: RefName::new("v0.9-rc").unwrap(),
//! });
//!
//! assert!(!plan.is_converged());
//! assert_eq!(plan.operations().len(), 1);
//! ```

use serde::Serialize;

use crate::core::types::{CommitHash, RefKind, RefName, RemoteName};
use crate::engine::events::Event;

/// What should happen to one ref name on one remote (or pair of remotes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    /// Every remote holding the ref agrees; nothing to do.
    InSync {
        name: RefName,
    },

    /// Move an existing ref on `target` to the hash `source` holds.
    Converge {
        target: RemoteName,
        source: RemoteName,
        name: RefName,
        hash: CommitHash,
        /// Commits `target` is behind; zero for tag mismatches.
        behind: u64,
    },

    /// Create the ref on `target`, which lacks it.
    Create {
        target: RemoteName,
        source: RemoteName,
        name: RefName,
        hash: CommitHash,
    },

    /// Remove the ref from `target`.
    Delete {
        target: RemoteName,
        name: RefName,
    },

    /// Histories diverged between two remotes. Never acted on.
    Conflict {
        left: RemoteName,
        right: RemoteName,
        name: RefName,
        left_hash: CommitHash,
        right_hash: CommitHash,
        /// Commits only `left` has.
        ahead: u64,
        /// Commits only `right` has.
        behind: u64,
    },

    /// A secondary holds commits the authority lacks. Never acted on.
    Ahead {
        remote: RemoteName,
        authority: RemoteName,
        name: RefName,
        hash: CommitHash,
        authority_hash: CommitHash,
        ahead: u64,
    },
}

impl Decision {
    /// The ref this decision is about.
    pub fn name(&self) -> &RefName {
        match self {
            Decision::InSync { name }
            | Decision::Converge { name, .. }
            | Decision::Create { name, .. }
            | Decision::Delete { name, .. }
            | Decision::Conflict { name, .. }
            | Decision::Ahead { name, .. } => name,
        }
    }

    /// The remote this decision writes to, if any.
    pub fn target(&self) -> Option<&RemoteName> {
        match self {
            Decision::Converge { target, .. }
            | Decision::Create { target, .. }
            | Decision::Delete { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Check if this decision needs a human.
    pub fn is_alert(&self) -> bool {
        matches!(self, Decision::Conflict { .. } | Decision::Ahead { .. })
    }

    /// Remotes involved, target first.
    pub fn remotes(&self) -> Vec<RemoteName> {
        match self {
            Decision::InSync { .. } => vec![],
            Decision::Converge { target, source, .. } | Decision::Create { target, source, .. } => {
                vec![target.clone(), source.clone()]
            }
            Decision::Delete { target, .. } => vec![target.clone()],
            Decision::Conflict { left, right, .. } => vec![left.clone(), right.clone()],
            Decision::Ahead {
                remote, authority, ..
            } => vec![remote.clone(), authority.clone()],
        }
    }

    /// The operation that carries out this decision, if any.
    pub fn operation(&self, kind: RefKind) -> Option<Operation> {
        let force = kind == RefKind::Tag;
        match self {
            Decision::Converge {
                target, name, hash, ..
            }
            | Decision::Create {
                target, name, hash, ..
            } => Some(Operation {
                remote: target.clone(),
                kind,
                name: name.clone(),
                action: OperationAction::Push {
                    hash: hash.clone(),
                    force,
                },
            }),
            Decision::Delete { target, name } => Some(Operation {
                remote: target.clone(),
                kind,
                name: name.clone(),
                action: OperationAction::Delete,
            }),
            _ => None,
        }
    }

    /// Human-readable description of this decision.
    pub fn description(&self, kind: RefKind) -> String {
        match self {
            Decision::InSync { name } => format!("{} {} is in sync", capitalized(kind), name),
            Decision::Converge {
                target,
                source,
                name,
                hash,
                ..
            } => format!(
                "Update {}:{} => {}:{}",
                target,
                kind.full_name(name),
                source,
                hash
            ),
            Decision::Create {
                target,
                source,
                name,
                hash,
            } => format!(
                "Create {}:{} => {}:{}",
                target,
                kind.full_name(name),
                source,
                hash
            ),
            Decision::Delete { target, name } => {
                format!("Remove {}:{}", target, kind.full_name(name))
            }
            Decision::Conflict {
                left,
                right,
                name,
                left_hash,
                right_hash,
                ahead,
                behind,
            } => format!(
                "{} {}/{} {} is {} commits ahead and {} commits behind {}/{} {}",
                capitalized(kind),
                left,
                name,
                left_hash,
                ahead,
                behind,
                right,
                name,
                right_hash
            ),
            Decision::Ahead {
                remote,
                authority,
                name,
                hash,
                authority_hash,
                ahead,
            } => format!(
                "{} {}/{} {} is {} commits ahead {}/{} {}",
                capitalized(kind),
                remote,
                name,
                hash,
                ahead,
                authority,
                name,
                authority_hash
            ),
        }
    }

    /// The diagnostic event announcing this decision, if it warrants one.
    pub fn event(&self, kind: RefKind) -> Option<Event> {
        let message = self.description(kind);
        match self {
            Decision::InSync { .. } => None,
            Decision::Conflict { .. } | Decision::Ahead { .. } => Some(Event::alert(
                kind,
                self.name().clone(),
                self.remotes(),
                message,
            )),
            _ => Some(Event::info(
                kind,
                self.name().clone(),
                self.remotes(),
                message,
            )),
        }
    }
}

fn capitalized(kind: RefKind) -> &'static str {
    match kind {
        RefKind::Branch => "Branch",
        RefKind::Tag => "Tag",
    }
}

/// What an operation does to the remote ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationAction {
    /// Point the ref at `hash`.
    Push { hash: CommitHash, force: bool },
    /// Remove the ref.
    Delete,
}

/// A single write against one remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    /// Remote to write to
    pub remote: RemoteName,
    /// Namespace of the ref
    pub kind: RefKind,
    /// Short ref name
    pub name: RefName,
    /// What to do
    pub action: OperationAction,
}

impl Operation {
    /// Check if this operation removes a ref.
    pub fn is_delete(&self) -> bool {
        matches!(self.action, OperationAction::Delete)
    }

    /// Git refspec equivalent of this operation.
    ///
    /// # Example
    ///
    /// ```
    /// use refmesh::core::types::{CommitHash, RefKind, RefName, RemoteName};
    /// use refmesh::engine::plan::{Operation, OperationAction};
    ///
    /// let op = Operation {
    ///     remote: RemoteName::new("backup").unwrap(),
    ///     kind: RefKind::Tag,
    ///     name: RefName::new("v1").unwrap(),
    ///     action: OperationAction::Push {
    ///         hash: CommitHash::new("abc123").unwrap(),
    ///         force: true,
    ///     },
    /// };
    /// assert_eq!(op.refspec(), "+abc123:refs/tags/v1");
    /// ```
    pub fn refspec(&self) -> String {
        match &self.action {
            OperationAction::Push { hash, force } => format!(
                "{}{}:{}",
                if *force { "+" } else { "" },
                hash,
                self.kind.full_name(&self.name)
            ),
            OperationAction::Delete => format!(":{}", self.kind.full_name(&self.name)),
        }
    }

    /// Get a human-readable description of this operation.
    pub fn description(&self) -> String {
        format!("push {} {}", self.remote, self.refspec())
    }
}

/// The decisions for one ref namespace, in ref-name order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Namespace the decisions apply to
    pub kind: RefKind,
    /// Decisions grouped by ref name
    pub decisions: Vec<Decision>,
}

impl Plan {
    /// Create an empty plan.
    pub fn new(kind: RefKind) -> Self {
        Self {
            kind,
            decisions: Vec::new(),
        }
    }

    /// Add a decision.
    pub fn with_decision(mut self, decision: Decision) -> Self {
        self.decisions.push(decision);
        self
    }

    /// Add several decisions.
    pub fn extend(&mut self, decisions: impl IntoIterator<Item = Decision>) {
        self.decisions.extend(decisions);
    }

    /// The writes needed to carry out this plan, in decision order.
    pub fn operations(&self) -> Vec<Operation> {
        self.decisions
            .iter()
            .filter_map(|d| d.operation(self.kind))
            .collect()
    }

    /// Conflict and ahead decisions.
    pub fn alerts(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|d| d.is_alert())
    }

    /// True when no writes are needed.
    pub fn is_converged(&self) -> bool {
        self.decisions.iter().all(|d| d.target().is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(name: &str) -> RemoteName {
        RemoteName::new(name).unwrap()
    }

    fn refname(name: &str) -> RefName {
        RefName::new(name).unwrap()
    }

    fn commit(hash: &str) -> CommitHash {
        CommitHash::new(hash).unwrap()
    }

    mod decisions {
        use super::*;

        #[test]
        fn branch_pushes_are_not_forced() {
            let decision = Decision::Converge {
                target: remote("b"),
                source: remote("a"),
                name: refname("main"),
                hash: commit("abc"),
                behind: 2,
            };
            let op = decision.operation(RefKind::Branch).unwrap();
            assert_eq!(op.refspec(), "abc:refs/heads/main");
        }

        #[test]
        fn tag_pushes_are_forced() {
            let decision = Decision::Create {
                target: remote("b"),
                source: remote("a"),
                name: refname("v1"),
                hash: commit("abc"),
            };
            let op = decision.operation(RefKind::Tag).unwrap();
            assert_eq!(op.refspec(), "+abc:refs/tags/v1");
        }

        #[test]
        fn alerts_produce_no_operation() {
            let conflict = Decision::Conflict {
                left: remote("second"),
                right: remote("third"),
                name: refname("develop"),
                left_hash: commit("h2"),
                right_hash: commit("h3"),
                ahead: 2,
                behind: 2,
            };
            assert!(conflict.operation(RefKind::Branch).is_none());
            assert!(conflict.is_alert());
            assert!(conflict.event(RefKind::Branch).unwrap().is_alert());
        }

        #[test]
        fn messages() {
            let update = Decision::Converge {
                target: remote("b"),
                source: remote("a"),
                name: refname("main"),
                hash: commit("abc"),
                behind: 1,
            };
            assert_eq!(
                update.description(RefKind::Branch),
                "Update b:refs/heads/main => a:abc"
            );

            let remove = Decision::Delete {
                target: remote("b"),
                name: refname("v1"),
            };
            assert_eq!(remove.description(RefKind::Tag), "Remove b:refs/tags/v1");

            let ahead = Decision::Ahead {
                remote: remote("b"),
                authority: remote("a"),
                name: refname("main"),
                hash: commit("h2"),
                authority_hash: commit("h1"),
                ahead: 3,
            };
            assert_eq!(
                ahead.description(RefKind::Branch),
                "Branch b/main h2 is 3 commits ahead a/main h1"
            );
        }

        #[test]
        fn in_sync_emits_nothing() {
            let decision = Decision::InSync {
                name: refname("main"),
            };
            assert!(decision.event(RefKind::Branch).is_none());
            assert!(decision.target().is_none());
        }
    }

    mod plans {
        use super::*;

        #[test]
        fn converged_plan() {
            let plan = Plan::new(RefKind::Branch)
                .with_decision(Decision::InSync {
                    name: refname("main"),
                })
                .with_decision(Decision::Conflict {
                    left: remote("a"),
                    right: remote("b"),
                    name: refname("develop"),
                    left_hash: commit("h1"),
                    right_hash: commit("h2"),
                    ahead: 1,
                    behind: 1,
                });
            assert!(plan.is_converged());
            assert_eq!(plan.alerts().count(), 1);
        }

        #[test]
        fn serializes_tagged() {
            let plan = Plan::new(RefKind::Tag).with_decision(Decision::Delete {
                target: remote("b"),
                name: refname("v1"),
            });
            let json = serde_json::to_value(&plan).unwrap();
            assert_eq!(json["decisions"][0]["type"], "delete");
            assert_eq!(json["kind"], "tag");
        }
    }
}
