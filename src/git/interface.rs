//! git::interface
//!
//! Repository gateway implementation using git2.
//!
//! This module is the **single doorway** to libgit2. No other module
//! imports `git2` directly; everything else sees the
//! [`RepositoryGateway`] trait and strong types.
//!
//! # Local namespaces
//!
//! Fetched refs are stored under `refs/refmesh/remotes/<remote>/<heads|tags>/<name>`
//! so every remote owns an isolated tracking namespace. Pushes stage the
//! commit under `refs/refmesh/staging/<remote>/...` because libgit2 pushes
//! named refs, not raw object ids. Fetches are serialized with a lock since
//! they all write into the same local repository.
//!
//! # Example
//!
//! ```ignore
//! use refmesh::git::{Git, RepositoryGateway};
//! use refmesh::core::types::{RefKind, RemoteName};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/srv/mirror.git"))?;
//! let origin = RemoteName::new("origin")?;
//! let branches = git.list_refs(&origin, RefKind::Branch)?;
//! ```

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, trace};

use super::gateway::{Distance, GatewayError, RemoteRefs, RepositoryGateway};
use crate::core::types::{CommitHash, RefKind, RefName, RemoteName};

/// Root of every ref this tool writes into the local repository.
pub const LOCAL_NAMESPACE: &str = "refs/refmesh";

/// Local ref that holds a fetched remote ref.
///
/// # Example
///
/// ```
/// use refmesh::core::types::{RefKind, RefName, RemoteName};
/// use refmesh::git::tracking_ref;
///
/// let remote = RemoteName::new("backup").unwrap();
/// let name = RefName::new("main").unwrap();
/// assert_eq!(
///     tracking_ref(&remote, RefKind::Branch, &name),
///     "refs/refmesh/remotes/backup/heads/main"
/// );
/// ```
pub fn tracking_ref(remote: &RemoteName, kind: RefKind, name: &RefName) -> String {
    format!("{}/remotes/{}/{}/{}", LOCAL_NAMESPACE, remote, kind.label(), name)
}

fn staging_ref(remote: &RemoteName, kind: RefKind, name: &RefName) -> String {
    format!("{}/staging/{}/{}/{}", LOCAL_NAMESPACE, remote, kind.label(), name)
}

impl GatewayError {
    fn internal(err: git2::Error) -> Self {
        GatewayError::Internal {
            message: err.message().to_string(),
        }
    }

    fn from_git2_remote(err: git2::Error, remote: &RemoteName) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GatewayError::RemoteNotFound {
                remote: remote.to_string(),
            },
            _ => GatewayError::ListFailed {
                remote: remote.to_string(),
                message: err.message().to_string(),
            },
        }
    }
}

/// The libgit2-backed repository gateway.
///
/// The repository is re-opened per call; `git2::Repository` is not `Sync`
/// and opening is cheap compared to network round trips.
pub struct Git {
    /// Path to the git directory
    git_dir: PathBuf,
    /// Serializes writes into the local repository
    fetch_lock: Mutex<()>,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git").field("path", &self.git_dir).finish()
    }
}

impl Git {
    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within the repository. Bare repositories are accepted.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NotARepo`] if no repository is found
    pub fn open(path: &Path) -> Result<Self, GatewayError> {
        let repo = git2::Repository::discover(path).map_err(|_| GatewayError::NotARepo {
            path: path.to_path_buf(),
        })?;

        Ok(Self {
            git_dir: repo.path().to_path_buf(),
            fetch_lock: Mutex::new(()),
        })
    }

    /// Path to the git directory (the repository itself when bare).
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Names of the remotes configured in the repository.
    pub fn configured_remotes(&self) -> Result<Vec<String>, GatewayError> {
        let repo = self.repo()?;
        let remotes = repo.remotes().map_err(GatewayError::internal)?;
        Ok(remotes.iter().flatten().flatten().map(String::from).collect())
    }

    fn repo(&self) -> Result<git2::Repository, GatewayError> {
        git2::Repository::open(&self.git_dir).map_err(|_| GatewayError::NotARepo {
            path: self.git_dir.clone(),
        })
    }

    /// Callbacks that answer credential requests from the git config.
    fn callbacks<'a>(repo: &git2::Repository) -> git2::RemoteCallbacks<'a> {
        let config = repo.config().ok();
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(move |url, username, allowed| {
            if allowed.contains(git2::CredentialType::SSH_KEY) {
                return git2::Cred::ssh_key_from_agent(username.unwrap_or("git"));
            }
            if allowed.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(config) = &config {
                    return git2::Cred::credential_helper(config, url, username);
                }
            }
            git2::Cred::default()
        });
        callbacks
    }

    /// Resolve a hash to a commit id, or `None` if the object is unknown.
    fn find_commit(
        repo: &git2::Repository,
        hash: &CommitHash,
    ) -> Result<Option<git2::Oid>, GatewayError> {
        let Ok(oid) = git2::Oid::from_str(hash.as_str()) else {
            return Ok(None);
        };
        let object = match repo.find_object(oid, None) {
            Ok(object) => object,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(GatewayError::internal(e)),
        };
        // Annotated tags point at a tag object; ancestry is measured on the commit.
        match object.peel_to_commit() {
            Ok(commit) => Ok(Some(commit.id())),
            Err(_) => Ok(None),
        }
    }

    /// Remove stale tracking refs for one remote and kind.
    fn clear_tracking(
        repo: &git2::Repository,
        remote: &RemoteName,
        kind: RefKind,
    ) -> Result<(), GatewayError> {
        let pattern = format!("{}/remotes/{}/{}/*", LOCAL_NAMESPACE, remote, kind.label());
        let mut stale = Vec::new();
        for reference in repo
            .references_glob(&pattern)
            .map_err(GatewayError::internal)?
        {
            let reference = reference.map_err(GatewayError::internal)?;
            if let Ok(name) = reference.name() {
                stale.push(name.to_string());
            }
        }

        for name in stale {
            let mut reference = repo.find_reference(&name).map_err(GatewayError::internal)?;
            reference.delete().map_err(GatewayError::internal)?;
        }
        Ok(())
    }

    /// Push a single refspec and surface per-ref rejections.
    fn push_refspec(
        &self,
        repo: &git2::Repository,
        remote: &RemoteName,
        refname: &str,
        refspec: &str,
    ) -> Result<(), GatewayError> {
        let push_failed = |e: git2::Error| GatewayError::PushFailed {
            remote: remote.to_string(),
            refname: refname.to_string(),
            message: e.message().to_string(),
        };

        let mut git_remote = repo
            .find_remote(remote.as_str())
            .map_err(|e| GatewayError::from_git2_remote(e, remote))?;

        let rejections: RefCell<Vec<(String, String)>> = RefCell::new(Vec::new());
        let mut callbacks = Self::callbacks(repo);
        callbacks.push_update_reference(|name, status| {
            if let Some(status) = status {
                rejections
                    .borrow_mut()
                    .push((name.to_string(), status.to_string()));
            }
            Ok(())
        });

        let mut options = git2::PushOptions::new();
        options.remote_callbacks(callbacks);

        debug!(%remote, refspec, "push");
        git_remote
            .push(&[refspec], Some(&mut options))
            .map_err(push_failed)?;

        if let Some((name, status)) = rejections.borrow().first() {
            return Err(GatewayError::Rejected {
                remote: remote.to_string(),
                refname: name.clone(),
                status: status.clone(),
            });
        }

        Ok(())
    }
}

impl RepositoryGateway for Git {
    fn list_refs(&self, remote: &RemoteName, kind: RefKind) -> Result<RemoteRefs, GatewayError> {
        let repo = self.repo()?;
        let mut git_remote = repo
            .find_remote(remote.as_str())
            .map_err(|e| GatewayError::from_git2_remote(e, remote))?;

        let connection = git_remote
            .connect_auth(git2::Direction::Fetch, Some(Self::callbacks(&repo)), None)
            .map_err(|e| GatewayError::ListFailed {
                remote: remote.to_string(),
                message: e.message().to_string(),
            })?;

        let heads = connection.list().map_err(|e| GatewayError::ListFailed {
            remote: remote.to_string(),
            message: e.message().to_string(),
        })?;

        let mut refs = RemoteRefs::new();
        for head in heads {
            let Some(short) = kind.strip(head.name()) else {
                continue;
            };
            // Peeled tag entries (`v1^{}`) fail name validation and are skipped here.
            let name = match RefName::new(short) {
                Ok(name) => name,
                Err(e) => {
                    trace!(%remote, refname = head.name(), error = %e, "skipping ref");
                    continue;
                }
            };
            refs.insert(name, CommitHash::new(head.oid().to_string())?);
        }

        debug!(%remote, %kind, count = refs.len(), "listed refs");
        Ok(refs)
    }

    fn fetch(
        &self,
        remote: &RemoteName,
        kind: RefKind,
        names: &[RefName],
    ) -> Result<(), GatewayError> {
        let _guard = self.fetch_lock.lock().map_err(|_| GatewayError::Internal {
            message: "fetch lock poisoned".to_string(),
        })?;

        let repo = self.repo()?;
        Self::clear_tracking(&repo, remote, kind)?;
        if names.is_empty() {
            return Ok(());
        }

        let refspecs: Vec<String> = names
            .iter()
            .map(|name| {
                format!(
                    "+{}:{}",
                    kind.full_name(name),
                    tracking_ref(remote, kind, name)
                )
            })
            .collect();

        let mut git_remote = repo
            .find_remote(remote.as_str())
            .map_err(|e| GatewayError::from_git2_remote(e, remote))?;

        let mut options = git2::FetchOptions::new();
        options.remote_callbacks(Self::callbacks(&repo));
        options.download_tags(git2::AutotagOption::None);

        debug!(%remote, %kind, count = refspecs.len(), "fetch");
        git_remote
            .fetch(&refspecs, Some(&mut options), Some("refmesh: fetch"))
            .map_err(|e| GatewayError::FetchFailed {
                remote: remote.to_string(),
                message: e.message().to_string(),
            })
    }

    fn distance(&self, left: &CommitHash, right: &CommitHash) -> Result<Distance, GatewayError> {
        if left == right {
            return Ok(Distance::EQUAL);
        }

        let repo = self.repo()?;
        let left_oid = Self::find_commit(&repo, left)?;
        let right_oid = Self::find_commit(&repo, right)?;

        let distance = match (left_oid, right_oid) {
            (Some(l), Some(r)) => {
                let (ahead, behind) =
                    repo.graph_ahead_behind(l, r)
                        .map_err(|e| GatewayError::DistanceFailed {
                            left: left.to_string(),
                            right: right.to_string(),
                            message: e.message().to_string(),
                        })?;
                Distance::new(ahead as u64, behind as u64)
            }
            (None, Some(_)) => Distance::left_missing(),
            (Some(_), None) => Distance::right_missing(),
            (None, None) => {
                return Err(GatewayError::DistanceFailed {
                    left: left.to_string(),
                    right: right.to_string(),
                    message: "neither commit is known locally".to_string(),
                });
            }
        };

        trace!(%left, %right, ahead = distance.ahead, behind = distance.behind, "distance");
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
        let repo = self.repo()?;
        let refname = kind.full_name(name);
        let oid = git2::Oid::from_str(hash.as_str())
            .map_err(|_| GatewayError::InvalidValue(format!("not an object id: {hash}")))?;

        let staging = staging_ref(remote, kind, name);
        repo.reference(&staging, oid, true, "refmesh: stage push")
            .map_err(|e| GatewayError::PushFailed {
                remote: remote.to_string(),
                refname: refname.clone(),
                message: e.message().to_string(),
            })?;

        let refspec = format!("{}{}:{}", if force { "+" } else { "" }, staging, refname);
        let result = self.push_refspec(&repo, remote, &refname, &refspec);

        if let Ok(mut reference) = repo.find_reference(&staging) {
            if let Err(e) = reference.delete() {
                debug!(%staging, error = %e.message(), "failed to remove staging ref");
            }
        }

        result
    }

    fn delete_ref(
        &self,
        remote: &RemoteName,
        kind: RefKind,
        name: &RefName,
    ) -> Result<(), GatewayError> {
        let repo = self.repo()?;
        let refname = kind.full_name(name);
        let refspec = format!(":{refname}");
        self.push_refspec(&repo, remote, &refname, &refspec)
    }
}
