//! git::gateway
//!
//! The repository gateway trait: the capability the reconciliation engine
//! consumes to talk to remotes and to the local object store.
//!
//! # Design
//!
//! Every method may block on I/O and may fail. These calls are the only
//! suspension points of a run. Implementations must be `Send + Sync` so
//! the engine can fan calls for different remotes out over a worker pool;
//! fetches into the shared local repository must be serialized by the
//! implementation.
//!
//! # Example
//!
//! ```ignore
//! use refmesh::git::RepositoryGateway;
//! use refmesh::core::types::RefKind;
//!
//! fn dump(gateway: &dyn RepositoryGateway, remote: &RemoteName) -> Result<(), GatewayError> {
//!     for (name, hash) in gateway.list_refs(remote, RefKind::Branch)? {
//!         println!("{remote}/{name} {}", hash.short(7));
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::core::types::{CommitHash, RefKind, RefName, RemoteName, TypeError};

/// Errors from gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The local path is not a git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// The remote is not configured in the local repository.
    #[error("remote '{remote}' is not configured")]
    RemoteNotFound {
        /// The missing remote
        remote: String,
    },

    /// Listing a remote's refs failed (unreachable, auth failure, ...).
    #[error("failed to list refs of '{remote}': {message}")]
    ListFailed {
        /// The remote being listed
        remote: String,
        /// Underlying error
        message: String,
    },

    /// Fetching refs into the local repository failed.
    #[error("failed to fetch from '{remote}': {message}")]
    FetchFailed {
        /// The remote being fetched
        remote: String,
        /// Underlying error
        message: String,
    },

    /// A push or delete could not be sent.
    #[error("failed to push {refname} to '{remote}': {message}")]
    PushFailed {
        /// The target remote
        remote: String,
        /// Full ref name on the remote
        refname: String,
        /// Underlying error
        message: String,
    },

    /// The remote refused a ref update.
    #[error("'{remote}' rejected {refname}: {status}")]
    Rejected {
        /// The target remote
        remote: String,
        /// Full ref name on the remote
        refname: String,
        /// Status reported by the remote
        status: String,
    },

    /// Ancestry query failed.
    #[error("failed to compare {left} with {right}: {message}")]
    DistanceFailed {
        /// Left commit
        left: String,
        /// Right commit
        right: String,
        /// Underlying error
        message: String,
    },

    /// A value returned by the repository could not be represented.
    #[error("invalid value from repository: {0}")]
    InvalidValue(String),

    /// Any other failure.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl From<TypeError> for GatewayError {
    fn from(err: TypeError) -> Self {
        GatewayError::InvalidValue(err.to_string())
    }
}

/// Commit-count distance between two commits.
///
/// `ahead` counts commits reachable from the left commit but not the
/// right one; `behind` counts the reverse. A side that does not exist is
/// treated as infinitely behind: its counterpart reports
/// [`Distance::UNBOUNDED`] ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Distance {
    /// Commits only the left side has.
    pub ahead: u64,
    /// Commits only the right side has.
    pub behind: u64,
}

impl Distance {
    /// Marker count for "the other side does not exist".
    pub const UNBOUNDED: u64 = u64::MAX;

    /// Both sides point at the same history.
    pub const EQUAL: Distance = Distance {
        ahead: 0,
        behind: 0,
    };

    /// Create a distance.
    pub fn new(ahead: u64, behind: u64) -> Self {
        Self { ahead, behind }
    }

    /// Distance when the left side is missing.
    pub fn left_missing() -> Self {
        Self::new(0, Self::UNBOUNDED)
    }

    /// Distance when the right side is missing.
    pub fn right_missing() -> Self {
        Self::new(Self::UNBOUNDED, 0)
    }

    /// Both sides have commits the other lacks.
    pub fn is_diverged(&self) -> bool {
        self.ahead > 0 && self.behind > 0
    }

    /// Neither side has commits the other lacks.
    pub fn is_equal(&self) -> bool {
        self.ahead == 0 && self.behind == 0
    }

    /// The same distance seen from the right side.
    ///
    /// # Example
    ///
    /// ```
    /// use refmesh::git::Distance;
    ///
    /// assert_eq!(Distance::new(2, 1).reversed(), Distance::new(1, 2));
    /// ```
    pub fn reversed(self) -> Self {
        Self::new(self.behind, self.ahead)
    }
}

/// The refs one remote holds in one namespace, keyed by short name.
pub type RemoteRefs = BTreeMap<RefName, CommitHash>;

/// Access to remotes and the local object store.
///
/// Implemented by [`crate::git::Git`] for real repositories and by
/// [`crate::git::mock::MockGateway`] for tests.
pub trait RepositoryGateway: Send + Sync {
    /// List a remote's refs of one kind without touching local state.
    fn list_refs(&self, remote: &RemoteName, kind: RefKind) -> Result<RemoteRefs, GatewayError>;

    /// Download the objects behind the named refs in one request.
    fn fetch(
        &self,
        remote: &RemoteName,
        kind: RefKind,
        names: &[RefName],
    ) -> Result<(), GatewayError>;

    /// Ancestry distance of `left` relative to `right`.
    ///
    /// One unknown side counts as missing. Equal hashes are equal even when
    /// unknown. Two distinct hashes that are both unknown cannot be
    /// compared and fail with [`GatewayError::DistanceFailed`].
    fn distance(&self, left: &CommitHash, right: &CommitHash) -> Result<Distance, GatewayError>;

    /// Point a remote's ref at `hash`, creating it if needed.
    fn push(
        &self,
        remote: &RemoteName,
        kind: RefKind,
        name: &RefName,
        hash: &CommitHash,
        force: bool,
    ) -> Result<(), GatewayError>;

    /// Remove a ref from a remote.
    fn delete_ref(
        &self,
        remote: &RemoteName,
        kind: RefKind,
        name: &RefName,
    ) -> Result<(), GatewayError>;
}
