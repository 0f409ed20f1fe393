//! git
//!
//! The repository gateway: the only seam between the reconciliation
//! engine and version control.
//!
//! # Architecture
//!
//! The engine consumes the [`RepositoryGateway`] trait and never imports
//! `git2`. Two implementations exist:
//!
//! - [`Git`]: libgit2-backed, talks to real remotes
//! - [`mock::MockGateway`]: in-memory remotes and commit graph for tests
//!
//! # Responsibilities
//!
//! - Listing a remote's branches or tags
//! - Fetching listed refs into isolated local tracking refs
//! - Ancestry distance between two commits
//! - Pushing and deleting refs on a remote
//!
//! # Invariants
//!
//! - Listing never mutates local state
//! - An unknown commit counts as a missing side, never as an error
//! - Fetches into the local repository are serialized
//!
//! # Example
//!
//! ```ignore
//! use refmesh::git::{Git, RepositoryGateway};
//! use refmesh::core::types::{RefKind, RemoteName};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let origin = RemoteName::new("origin")?;
//! let tags = git.list_refs(&origin, RefKind::Tag)?;
//! git.fetch(&origin, RefKind::Tag, &tags.keys().cloned().collect::<Vec<_>>())?;
//! ```

mod gateway;
mod interface;
pub mod mock;

pub use gateway::{Distance, GatewayError, RemoteRefs, RepositoryGateway};
pub use interface::{tracking_ref, Git, LOCAL_NAMESPACE};
