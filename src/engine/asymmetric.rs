//! engine::asymmetric
//!
//! Reconciliation against an authoritative remote.
//!
//! # Branches
//!
//! For every branch the authority holds, each secondary is classified by
//! its distance to the authority: missing (create), behind (converge),
//! ahead (alert), diverged (conflict) or equal. Branches the authority
//! lacks are deleted from every secondary holding them; the authority
//! alone defines which branches exist.
//!
//! If any secondary has diverged from the authority on a branch, no write
//! is emitted for that branch on any remote.
//!
//! # Tags
//!
//! Tags carry no ancestry to adjudicate: a missing or different tag is
//! overwritten with the authority's hash, and tags the authority lacks
//! are deleted.
//!
//! # Invariants
//!
//! - The authority is never the target of a decision
//! - Distances are measured for all names before any decision is made

use rayon::prelude::*;

use super::distance::DistanceOracle;
use super::inventory::RemoteRefTable;
use super::plan::{Decision, Plan};
use crate::core::types::{CommitHash, RefKind, RefName, RemoteName};
use crate::git::{Distance, GatewayError, RepositoryGateway};

/// One secondary remote's view of a ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryHead {
    /// The secondary remote
    pub remote: RemoteName,
    /// Its hash, if it holds the ref
    pub head: Option<CommitHash>,
    /// Its distance relative to the authority, when both hold the ref and
    /// ancestry applies
    pub distance: Option<Distance>,
}

/// Everything measured about one ref name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefMeasurement {
    /// The ref name
    pub name: RefName,
    /// The authority's hash, if it holds the ref
    pub authority: Option<CommitHash>,
    /// Secondaries in caller order
    pub secondaries: Vec<SecondaryHead>,
}

/// Measure every ref name in the table against the authority.
///
/// Distances are only queried for branches.
///
/// # Errors
///
/// The first failed distance query.
pub fn measure<G>(
    table: &RemoteRefTable,
    authority: &RemoteName,
    oracle: &DistanceOracle<'_, G>,
    pool: &rayon::ThreadPool,
) -> Result<Vec<RefMeasurement>, GatewayError>
where
    G: RepositoryGateway + ?Sized,
{
    let with_ancestry = table.kind() == RefKind::Branch;
    let names: Vec<&RefName> = table.names().into_iter().collect();

    pool.install(|| {
        names
            .par_iter()
            .map(|name| -> Result<RefMeasurement, GatewayError> {
                let primary = table.hash(authority, name).cloned();
                let secondaries = table
                    .remotes()
                    .without(authority)
                    .map(|remote| -> Result<SecondaryHead, GatewayError> {
                        let head = table.hash(remote, name).cloned();
                        let distance = match (&head, &primary) {
                            (Some(h), Some(p)) if with_ancestry => {
                                Some(oracle.distance(Some(h), Some(p))?)
                            }
                            _ => None,
                        };
                        Ok(SecondaryHead {
                            remote: remote.clone(),
                            head,
                            distance,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(RefMeasurement {
                    name: (*name).clone(),
                    authority: primary,
                    secondaries,
                })
            })
            .collect()
    })
}

/// Decisions for secondaries holding a ref the authority lacks.
fn obsolete(measurement: &RefMeasurement) -> Vec<Decision> {
    measurement
        .secondaries
        .iter()
        .filter(|secondary| secondary.head.is_some())
        .map(|secondary| Decision::Delete {
            target: secondary.remote.clone(),
            name: measurement.name.clone(),
        })
        .collect()
}

fn in_sync_if_empty(mut decisions: Vec<Decision>, name: &RefName) -> Vec<Decision> {
    if decisions.is_empty() {
        decisions.push(Decision::InSync { name: name.clone() });
    }
    decisions
}

/// Decide what happens to one branch.
pub fn decide_branch(authority: &RemoteName, measurement: &RefMeasurement) -> Vec<Decision> {
    let name = &measurement.name;
    let Some(primary) = &measurement.authority else {
        return in_sync_if_empty(obsolete(measurement), name);
    };

    let mut writes = Vec::new();
    let mut alerts = Vec::new();
    for secondary in &measurement.secondaries {
        let Some(head) = &secondary.head else {
            writes.push(Decision::Create {
                target: secondary.remote.clone(),
                source: authority.clone(),
                name: name.clone(),
                hash: primary.clone(),
            });
            continue;
        };

        // An unmeasured pair of distinct heads has no known relationship.
        let distance = match secondary.distance {
            Some(distance) => distance,
            None if head == primary => Distance::EQUAL,
            None => Distance::new(Distance::UNBOUNDED, Distance::UNBOUNDED),
        };

        if distance.is_diverged() {
            alerts.push(Decision::Conflict {
                left: secondary.remote.clone(),
                right: authority.clone(),
                name: name.clone(),
                left_hash: head.clone(),
                right_hash: primary.clone(),
                ahead: distance.ahead,
                behind: distance.behind,
            });
        } else if distance.ahead > 0 {
            alerts.push(Decision::Ahead {
                remote: secondary.remote.clone(),
                authority: authority.clone(),
                name: name.clone(),
                hash: head.clone(),
                authority_hash: primary.clone(),
                ahead: distance.ahead,
            });
        } else if distance.behind > 0 {
            writes.push(Decision::Converge {
                target: secondary.remote.clone(),
                source: authority.clone(),
                name: name.clone(),
                hash: primary.clone(),
                behind: distance.behind,
            });
        }
    }

    let conflicted = alerts
        .iter()
        .any(|d| matches!(d, Decision::Conflict { .. }));
    if conflicted {
        return alerts;
    }

    writes.extend(alerts);
    in_sync_if_empty(writes, name)
}

/// Decide what happens to one tag.
pub fn decide_tag(authority: &RemoteName, measurement: &RefMeasurement) -> Vec<Decision> {
    let name = &measurement.name;
    let Some(primary) = &measurement.authority else {
        return in_sync_if_empty(obsolete(measurement), name);
    };

    let decisions = measurement
        .secondaries
        .iter()
        .filter_map(|secondary| match &secondary.head {
            None => Some(Decision::Create {
                target: secondary.remote.clone(),
                source: authority.clone(),
                name: name.clone(),
                hash: primary.clone(),
            }),
            Some(head) if head != primary => Some(Decision::Converge {
                target: secondary.remote.clone(),
                source: authority.clone(),
                name: name.clone(),
                hash: primary.clone(),
                behind: 0,
            }),
            Some(_) => None,
        })
        .collect();

    in_sync_if_empty(decisions, name)
}

/// Decide every measured ref name.
pub fn plan(kind: RefKind, authority: &RemoteName, measurements: &[RefMeasurement]) -> Plan {
    let mut plan = Plan::new(kind);
    for measurement in measurements {
        match kind {
            RefKind::Branch => plan.extend(decide_branch(authority, measurement)),
            RefKind::Tag => plan.extend(decide_tag(authority, measurement)),
        }
    }
    plan
}
