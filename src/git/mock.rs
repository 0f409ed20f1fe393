//! git::mock
//!
//! In-memory repository gateway for deterministic testing.
//!
//! # Design
//!
//! The mock holds a single commit graph shared by every remote, the refs
//! each remote points into it, and the set of commits the "local
//! repository" has fetched. Distances are only answered for fetched
//! commits, so a reconciler that skips the fetch sees missing sides just
//! like it would against a real repository. Non-forced pushes that are not
//! fast-forwards are rejected.
//!
//! Every call is recorded, and any call can be configured to fail.
//!
//! # Example
//!
//! ```
//! use refmesh::core::types::{CommitHash, RefKind, RefName, RemoteName};
//! use refmesh::git::mock::MockGateway;
//! use refmesh::git::{Distance, RepositoryGateway};
//!
//! let a = RemoteName::new("a").unwrap();
//! let main = RefName::new("main").unwrap();
//! let c1 = CommitHash::new("c1").unwrap();
//! let c2 = CommitHash::new("c2").unwrap();
//!
//! let gateway = MockGateway::new()
//!     .with_commit(&c1, &[])
//!     .with_commit(&c2, &[&c1])
//!     .with_ref(&a, RefKind::Branch, &main, &c2);
//!
//! gateway.fetch(&a, RefKind::Branch, &[main.clone()]).unwrap();
//! assert_eq!(gateway.distance(&c2, &c1).unwrap(), Distance::new(1, 0));
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::gateway::{Distance, GatewayError, RemoteRefs, RepositoryGateway};
use crate::core::types::{CommitHash, RefKind, RefName, RemoteName};

/// Mock gateway for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    inner: Arc<Mutex<MockGatewayInner>>,
}

#[derive(Debug, Default)]
struct MockGatewayInner {
    /// Parents of every known commit.
    parents: HashMap<CommitHash, Vec<CommitHash>>,
    /// Refs per remote.
    remotes: BTreeMap<RemoteName, RemoteState>,
    /// Commits present in the local object store.
    local: HashSet<CommitHash>,
    /// Calls that should fail.
    fail_on: Vec<FailOn>,
    /// Recorded calls for verification.
    operations: Vec<MockOperation>,
}

#[derive(Debug, Default, Clone)]
struct RemoteState {
    branches: RemoteRefs,
    tags: RemoteRefs,
}

impl RemoteState {
    fn refs(&self, kind: RefKind) -> &RemoteRefs {
        match kind {
            RefKind::Branch => &self.branches,
            RefKind::Tag => &self.tags,
        }
    }

    fn refs_mut(&mut self, kind: RefKind) -> &mut RemoteRefs {
        match kind {
            RefKind::Branch => &mut self.branches,
            RefKind::Tag => &mut self.tags,
        }
    }
}

/// Configuration for which call should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOn {
    /// Fail `list_refs` for this remote.
    ListRefs(RemoteName),
    /// Fail `fetch` for this remote.
    Fetch(RemoteName),
    /// Fail `push` to this remote.
    Push(RemoteName),
    /// Fail `delete_ref` on this remote.
    Delete(RemoteName),
    /// Fail every `distance` query.
    Distance,
}

/// Recorded call for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ListRefs {
        remote: RemoteName,
        kind: RefKind,
    },
    Fetch {
        remote: RemoteName,
        kind: RefKind,
        names: Vec<RefName>,
    },
    Distance {
        left: CommitHash,
        right: CommitHash,
    },
    Push {
        remote: RemoteName,
        kind: RefKind,
        name: RefName,
        hash: CommitHash,
        force: bool,
    },
    Delete {
        remote: RemoteName,
        kind: RefKind,
        name: RefName,
    },
}

impl MockOperation {
    /// True for calls that change a remote.
    pub fn is_write(&self) -> bool {
        matches!(self, MockOperation::Push { .. } | MockOperation::Delete { .. })
    }
}

impl MockGateway {
    /// Create an empty mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockGatewayInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a commit with the given parents to the shared graph.
    pub fn with_commit(self, hash: &CommitHash, parents: &[&CommitHash]) -> Self {
        self.add_commit(hash, parents);
        self
    }

    /// Add a commit with the given parents to the shared graph.
    pub fn add_commit(&self, hash: &CommitHash, parents: &[&CommitHash]) {
        let mut inner = self.state();
        inner
            .parents
            .insert(hash.clone(), parents.iter().map(|p| (*p).clone()).collect());
    }

    /// Register a remote with no refs.
    pub fn with_remote(self, remote: &RemoteName) -> Self {
        self.state().remotes.entry(remote.clone()).or_default();
        self
    }

    /// Point a remote's ref at a commit.
    pub fn with_ref(self, remote: &RemoteName, kind: RefKind, name: &RefName, hash: &CommitHash) -> Self {
        self.set_ref(remote, kind, name, hash);
        self
    }

    /// Point a remote's ref at a commit, as an external actor would.
    pub fn set_ref(&self, remote: &RemoteName, kind: RefKind, name: &RefName, hash: &CommitHash) {
        let mut inner = self.state();
        inner
            .remotes
            .entry(remote.clone())
            .or_default()
            .refs_mut(kind)
            .insert(name.clone(), hash.clone());
    }

    /// Remove a remote's ref, as an external actor would.
    pub fn remove_ref(&self, remote: &RemoteName, kind: RefKind, name: &RefName) {
        let mut inner = self.state();
        if let Some(state) = inner.remotes.get_mut(remote) {
            state.refs_mut(kind).remove(name);
        }
    }

    /// Configure a call to fail.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on.push(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on.clear();
    }

    /// Current refs of one remote.
    pub fn remote_refs(&self, remote: &RemoteName, kind: RefKind) -> RemoteRefs {
        let inner = self.state();
        inner
            .remotes
            .get(remote)
            .map(|state| state.refs(kind).clone())
            .unwrap_or_default()
    }

    /// Current hash of one remote ref.
    pub fn ref_hash(&self, remote: &RemoteName, kind: RefKind, name: &RefName) -> Option<CommitHash> {
        self.remote_refs(remote, kind).get(name).cloned()
    }

    /// All recorded calls.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Recorded pushes and deletes only.
    pub fn writes(&self) -> Vec<MockOperation> {
        self.state()
            .operations
            .iter()
            .filter(|op| op.is_write())
            .cloned()
            .collect()
    }

    /// Clear recorded calls.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    fn record(&self, op: MockOperation) {
        self.state().operations.push(op);
    }

    fn should_fail(&self, fail_on: &FailOn) -> bool {
        self.state().fail_on.contains(fail_on)
    }
}

impl MockGatewayInner {
    /// The commit and everything reachable from it.
    fn ancestry(&self, hash: &CommitHash) -> HashSet<CommitHash> {
        let mut seen = HashSet::new();
        let mut stack = vec![hash.clone()];
        while let Some(commit) = stack.pop() {
            if !seen.insert(commit.clone()) {
                continue;
            }
            if let Some(parents) = self.parents.get(&commit) {
                stack.extend(parents.iter().cloned());
            }
        }
        seen
    }

    fn remote(&self, remote: &RemoteName) -> Result<&RemoteState, GatewayError> {
        self.remotes
            .get(remote)
            .ok_or_else(|| GatewayError::RemoteNotFound {
                remote: remote.to_string(),
            })
    }
}

impl RepositoryGateway for MockGateway {
    fn list_refs(&self, remote: &RemoteName, kind: RefKind) -> Result<RemoteRefs, GatewayError> {
        self.record(MockOperation::ListRefs {
            remote: remote.clone(),
            kind,
        });

        if self.should_fail(&FailOn::ListRefs(remote.clone())) {
            return Err(GatewayError::ListFailed {
                remote: remote.to_string(),
                message: "connection refused".to_string(),
            });
        }

        let inner = self.state();
        Ok(inner.remote(remote)?.refs(kind).clone())
    }

    fn fetch(
        &self,
        remote: &RemoteName,
        kind: RefKind,
        names: &[RefName],
    ) -> Result<(), GatewayError> {
        self.record(MockOperation::Fetch {
            remote: remote.clone(),
            kind,
            names: names.to_vec(),
        });

        if self.should_fail(&FailOn::Fetch(remote.clone())) {
            return Err(GatewayError::FetchFailed {
                remote: remote.to_string(),
                message: "connection reset".to_string(),
            });
        }

        let mut inner = self.state();
        let refs = inner.remote(remote)?.refs(kind).clone();
        let mut fetched = HashSet::new();
        for name in names {
            let hash = refs.get(name).ok_or_else(|| GatewayError::FetchFailed {
                remote: remote.to_string(),
                message: format!("couldn't find remote ref {}", kind.full_name(name)),
            })?;
            fetched.extend(inner.ancestry(hash));
        }
        inner.local.extend(fetched);
        Ok(())
    }

    fn distance(&self, left: &CommitHash, right: &CommitHash) -> Result<Distance, GatewayError> {
        self.record(MockOperation::Distance {
            left: left.clone(),
            right: right.clone(),
        });

        if self.should_fail(&FailOn::Distance) {
            return Err(GatewayError::DistanceFailed {
                left: left.to_string(),
                right: right.to_string(),
                message: "revision walk failed".to_string(),
            });
        }

        if left == right {
            return Ok(Distance::EQUAL);
        }

        let inner = self.state();
        let distance = match (inner.local.contains(left), inner.local.contains(right)) {
            (true, true) => {
                let ours = inner.ancestry(left);
                let theirs = inner.ancestry(right);
                Distance::new(
                    ours.difference(&theirs).count() as u64,
                    theirs.difference(&ours).count() as u64,
                )
            }
            (false, true) => Distance::left_missing(),
            (true, false) => Distance::right_missing(),
            (false, false) => {
                return Err(GatewayError::DistanceFailed {
                    left: left.to_string(),
                    right: right.to_string(),
                    message: "neither commit is known locally".to_string(),
                });
            }
        };
        Ok(distance)
    }

    fn push(
        &self,
        remote: &RemoteName,
        kind: RefKind,
        name: &RefName,
        hash: &CommitHash,
        force: bool,
    ) -> Result<(), GatewayError> {
        self.record(MockOperation::Push {
            remote: remote.clone(),
            kind,
            name: name.clone(),
            hash: hash.clone(),
            force,
        });

        let refname = kind.full_name(name);
        if self.should_fail(&FailOn::Push(remote.clone())) {
            return Err(GatewayError::PushFailed {
                remote: remote.to_string(),
                refname,
                message: "permission denied".to_string(),
            });
        }

        let mut inner = self.state();
        if !inner.local.contains(hash) {
            return Err(GatewayError::PushFailed {
                remote: remote.to_string(),
                refname,
                message: format!("src refspec {hash} does not match any object"),
            });
        }

        let current = inner.remote(remote)?.refs(kind).get(name).cloned();
        if let Some(current) = current {
            if !force && !inner.ancestry(hash).contains(&current) {
                return Err(GatewayError::Rejected {
                    remote: remote.to_string(),
                    refname,
                    status: "non-fast-forward".to_string(),
                });
            }
        }

        if let Some(state) = inner.remotes.get_mut(remote) {
            state.refs_mut(kind).insert(name.clone(), hash.clone());
        }
        Ok(())
    }

    fn delete_ref(
        &self,
        remote: &RemoteName,
        kind: RefKind,
        name: &RefName,
    ) -> Result<(), GatewayError> {
        self.record(MockOperation::Delete {
            remote: remote.clone(),
            kind,
            name: name.clone(),
        });

        let refname = kind.full_name(name);
        if self.should_fail(&FailOn::Delete(remote.clone())) {
            return Err(GatewayError::PushFailed {
                remote: remote.to_string(),
                refname,
                message: "permission denied".to_string(),
            });
        }

        let mut inner = self.state();
        inner.remote(remote)?;
        let removed = inner
            .remotes
            .get_mut(remote)
            .and_then(|state| state.refs_mut(kind).remove(name));
        match removed {
            Some(_) => Ok(()),
            None => Err(GatewayError::Rejected {
                remote: remote.to_string(),
                refname,
                status: "remote ref does not exist".to_string(),
            }),
        }
    }
}
