//! engine::symmetric
//!
//! Symmetric branch reconciliation: no remote is authoritative.
//!
//! # Algorithm
//!
//! For each ref name, every pair of remotes holding it is measured once.
//! A single diverged pair marks the whole name as conflicting and nothing
//! is pushed for it. Otherwise every remote that is behind some peer (or
//! lacks the ref) receives the hash of the most advanced peer ahead of it.
//!
//! Measuring happens for all names before any decision is made; deciding
//! is a pure function of the measurements.
//!
//! # Source selection
//!
//! Among the peers ahead of a target, the source is the one with the
//! largest lead over the target, then the one with the most remotes behind
//! it, then the earliest in caller order.

use rayon::prelude::*;

use super::distance::DistanceOracle;
use super::inventory::RemoteRefTable;
use super::plan::{Decision, Plan};
use crate::core::types::{CommitHash, RefKind, RefName, RemoteSet};
use crate::git::{Distance, GatewayError, RepositoryGateway};

/// Distance between the remotes at two positions of the remote set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairDistance {
    /// Position of the left remote
    pub left: usize,
    /// Position of the right remote
    pub right: usize,
    /// Left relative to right
    pub distance: Distance,
}

/// Everything measured about one ref name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefMeasurement {
    /// The ref name
    pub name: RefName,
    /// Each remote's hash, by position in the remote set
    pub heads: Vec<Option<CommitHash>>,
    /// One entry per pair of remotes that both hold the ref, `left < right`
    pub pairs: Vec<PairDistance>,
}

/// Measure every ref name in the table.
///
/// # Errors
///
/// The first failed distance query.
pub fn measure<G>(
    table: &RemoteRefTable,
    oracle: &DistanceOracle<'_, G>,
    pool: &rayon::ThreadPool,
) -> Result<Vec<RefMeasurement>, GatewayError>
where
    G: RepositoryGateway + ?Sized,
{
    let names: Vec<&RefName> = table.names().into_iter().collect();
    pool.install(|| {
        names
            .par_iter()
            .map(|name| measure_ref(table, oracle, name))
            .collect()
    })
}

fn measure_ref<G>(
    table: &RemoteRefTable,
    oracle: &DistanceOracle<'_, G>,
    name: &RefName,
) -> Result<RefMeasurement, GatewayError>
where
    G: RepositoryGateway + ?Sized,
{
    let heads = table.heads(name);
    let mut pairs = Vec::new();
    for (left, left_head) in heads.iter().enumerate() {
        let Some(left_head) = left_head else { continue };
        for (right, right_head) in heads.iter().enumerate().skip(left + 1) {
            let Some(right_head) = right_head else { continue };
            let distance = oracle.distance(Some(left_head), Some(right_head))?;
            pairs.push(PairDistance {
                left,
                right,
                distance,
            });
        }
    }

    Ok(RefMeasurement {
        name: name.clone(),
        heads,
        pairs,
    })
}

/// Decide what happens to one ref name.
pub fn decide(remotes: &RemoteSet, measurement: &RefMeasurement) -> Vec<Decision> {
    let names = remotes.as_slice();
    let heads = &measurement.heads;

    let conflicts: Vec<Decision> = measurement
        .pairs
        .iter()
        .filter(|pair| pair.distance.is_diverged())
        .filter_map(|pair| {
            Some(Decision::Conflict {
                left: names.get(pair.left)?.clone(),
                right: names.get(pair.right)?.clone(),
                name: measurement.name.clone(),
                left_hash: heads.get(pair.left)?.clone()?,
                right_hash: heads.get(pair.right)?.clone()?,
                ahead: pair.distance.ahead,
                behind: pair.distance.behind,
            })
        })
        .collect();
    if !conflicts.is_empty() {
        return conflicts;
    }

    // lag[i][j]: commits remote i is missing that remote j has.
    let n = heads.len().min(names.len());
    let mut lag = vec![vec![0u64; n]; n];
    for pair in &measurement.pairs {
        if pair.left >= n || pair.right >= n {
            continue;
        }
        if pair.distance.ahead > 0 {
            lag[pair.right][pair.left] = pair.distance.ahead;
        }
        if pair.distance.behind > 0 {
            lag[pair.left][pair.right] = pair.distance.behind;
        }
    }
    for target in 0..n {
        if heads[target].is_some() {
            continue;
        }
        for source in 0..n {
            if heads[source].is_some() {
                lag[target][source] = Distance::UNBOUNDED;
            }
        }
    }

    let advancement: Vec<usize> = (0..n)
        .map(|source| (0..n).filter(|&target| lag[target][source] > 0).count())
        .collect();

    let mut decisions = Vec::new();
    for target in 0..n {
        let source = (0..n).filter(|&s| lag[target][s] > 0).max_by(|&a, &b| {
            (lag[target][a], advancement[a])
                .cmp(&(lag[target][b], advancement[b]))
                .then(b.cmp(&a))
        });
        let Some(source) = source else { continue };
        let Some(hash) = heads[source].clone() else {
            continue;
        };

        let decision = if heads[target].is_some() {
            Decision::Converge {
                target: names[target].clone(),
                source: names[source].clone(),
                name: measurement.name.clone(),
                hash,
                behind: lag[target][source],
            }
        } else {
            Decision::Create {
                target: names[target].clone(),
                source: names[source].clone(),
                name: measurement.name.clone(),
                hash,
            }
        };
        decisions.push(decision);
    }

    if decisions.is_empty() {
        decisions.push(Decision::InSync {
            name: measurement.name.clone(),
        });
    }
    decisions
}

/// Decide every measured ref name.
pub fn plan(remotes: &RemoteSet, measurements: &[RefMeasurement]) -> Plan {
    let mut plan = Plan::new(RefKind::Branch);
    for measurement in measurements {
        plan.extend(decide(remotes, measurement));
    }
    plan
}
