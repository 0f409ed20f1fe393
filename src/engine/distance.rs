//! engine::distance
//!
//! Ancestry distance oracle with a per-run cache.
//!
//! Each unordered commit pair is queried at most once; the reverse
//! direction is answered from the cache. A missing side never reaches the
//! gateway: the present side is unconditionally ahead.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::core::types::CommitHash;
use crate::git::{Distance, GatewayError, RepositoryGateway};

/// Cached distance queries for one run.
pub struct DistanceOracle<'g, G: ?Sized> {
    gateway: &'g G,
    cache: Mutex<HashMap<(CommitHash, CommitHash), Distance>>,
}

impl<'g, G> DistanceOracle<'g, G>
where
    G: RepositoryGateway + ?Sized,
{
    /// Create an oracle with an empty cache.
    pub fn new(gateway: &'g G) -> Self {
        Self {
            gateway,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Distance of `left` relative to `right`, where either ref may be absent.
    ///
    /// # Example
    ///
    /// ```
    /// use refmesh::core::types::CommitHash;
    /// use refmesh::engine::distance::DistanceOracle;
    /// use refmesh::git::mock::MockGateway;
    /// use refmesh::git::Distance;
    ///
    /// let gateway = MockGateway::new();
    /// let oracle = DistanceOracle::new(&gateway);
    /// let head = CommitHash::new("c1").unwrap();
    ///
    /// assert_eq!(oracle.distance(Some(&head), None).unwrap(), Distance::right_missing());
    /// assert_eq!(oracle.distance(None, None).unwrap(), Distance::EQUAL);
    /// ```
    pub fn distance(
        &self,
        left: Option<&CommitHash>,
        right: Option<&CommitHash>,
    ) -> Result<Distance, GatewayError> {
        match (left, right) {
            (Some(l), Some(r)) => self.between(l, r),
            (Some(_), None) => Ok(Distance::right_missing()),
            (None, Some(_)) => Ok(Distance::left_missing()),
            (None, None) => Ok(Distance::EQUAL),
        }
    }

    fn between(&self, left: &CommitHash, right: &CommitHash) -> Result<Distance, GatewayError> {
        if left == right {
            return Ok(Distance::EQUAL);
        }

        if let Some(distance) = self.cached(left, right) {
            return Ok(distance);
        }

        let distance = self.gateway.distance(left, right)?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((left.clone(), right.clone()), distance);
        Ok(distance)
    }

    fn cached(&self, left: &CommitHash, right: &CommitHash) -> Option<Distance> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(distance) = cache.get(&(left.clone(), right.clone())) {
            return Some(*distance);
        }
        cache
            .get(&(right.clone(), left.clone()))
            .map(|distance| distance.reversed())
    }

    /// Number of gateway queries answered so far.
    pub fn queries(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{RefKind, RefName, RemoteName};
    use crate::git::mock::{FailOn, MockGateway, MockOperation};

    fn commit(hash: &str) -> CommitHash {
        CommitHash::new(hash).unwrap()
    }

    fn fetched() -> MockGateway {
        let origin = RemoteName::new("origin").unwrap();
        let gateway = MockGateway::new()
            .with_commit(&commit("c1"), &[])
            .with_commit(&commit("c2"), &[&commit("c1")])
            .with_ref(&origin, RefKind::Branch, &RefName::new("main").unwrap(), &commit("c2"));
        gateway
            .fetch(&origin, RefKind::Branch, &[RefName::new("main").unwrap()])
            .unwrap();
        gateway
    }

    fn distance_queries(gateway: &MockGateway) -> usize {
        gateway
            .operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::Distance { .. }))
            .count()
    }

    #[test]
    fn reverse_direction_is_cached() {
        let gateway = fetched();
        let oracle = DistanceOracle::new(&gateway);

        let forward = oracle.distance(Some(&commit("c2")), Some(&commit("c1"))).unwrap();
        let backward = oracle.distance(Some(&commit("c1")), Some(&commit("c2"))).unwrap();

        assert_eq!(forward, Distance::new(1, 0));
        assert_eq!(backward, Distance::new(0, 1));
        assert_eq!(distance_queries(&gateway), 1);
        assert_eq!(oracle.queries(), 1);
    }

    #[test]
    fn equal_and_missing_sides_skip_gateway() {
        let gateway = fetched();
        let oracle = DistanceOracle::new(&gateway);

        assert!(oracle
            .distance(Some(&commit("c1")), Some(&commit("c1")))
            .unwrap()
            .is_equal());
        assert_eq!(
            oracle.distance(None, Some(&commit("c1"))).unwrap(),
            Distance::left_missing()
        );
        assert_eq!(distance_queries(&gateway), 0);
    }

    #[test]
    fn gateway_failure_propagates() {
        let gateway = fetched().fail_on(FailOn::Distance);
        let oracle = DistanceOracle::new(&gateway);
        assert!(oracle
            .distance(Some(&commit("c1")), Some(&commit("c2")))
            .is_err());
    }
}
