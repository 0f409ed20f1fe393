//! Shared fixtures for tests that run against real repositories.
//!
//! Remotes are bare repositories in a temp dir, registered as remotes of a
//! local repository by path. Commits are built with a fixed signature and
//! timestamp, so the same message chain yields the same commit ids in
//! every repository without any transfer between them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

/// A local repository with a set of bare remotes.
pub struct Mesh {
    dir: TempDir,
    local: PathBuf,
}

impl Mesh {
    /// A bare local repository with one bare remote per name.
    pub fn new(remotes: &[&str]) -> Self {
        Self::build(remotes, true)
    }

    /// Like [`Mesh::new`], but the local repository has a working tree.
    pub fn with_worktree(remotes: &[&str]) -> Self {
        Self::build(remotes, false)
    }

    fn build(remotes: &[&str], bare: bool) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let local = dir.path().join("local");
        let repo = if bare {
            Repository::init_bare(&local)
        } else {
            Repository::init(&local)
        }
        .expect("failed to init local repo");

        let mesh = Self { dir, local };
        for name in remotes {
            let path = mesh.remote_path(name);
            Repository::init_bare(&path).expect("failed to init remote");
            repo.remote(name, path.to_str().expect("utf-8 temp path"))
                .expect("failed to add remote");
        }
        mesh
    }

    /// Path of the local repository.
    pub fn local(&self) -> &Path {
        &self.local
    }

    /// Path of the temp dir holding everything.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a remote's bare repository.
    pub fn remote_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{name}.git"))
    }

    fn open(&self, name: &str) -> Repository {
        Repository::open_bare(self.remote_path(name)).expect("failed to open remote")
    }

    /// Build a linear chain of commits in a remote; returns their ids.
    pub fn chain(&self, remote: &str, messages: &[&str]) -> Vec<Oid> {
        let repo = self.open(remote);
        let sig = Signature::new("Test User", "test@example.com", &Time::new(1_700_000_000, 0))
            .expect("signature");
        let tree_id = repo
            .treebuilder(None)
            .and_then(|builder| builder.write())
            .expect("empty tree");
        let tree = repo.find_tree(tree_id).expect("tree");

        let mut ids: Vec<Oid> = Vec::new();
        for message in messages {
            let parents: Vec<git2::Commit<'_>> = ids
                .last()
                .map(|id| repo.find_commit(*id).expect("parent"))
                .into_iter()
                .collect();
            let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
            let id = repo
                .commit(None, &sig, &sig, message, &tree, &parent_refs)
                .expect("commit");
            ids.push(id);
        }
        ids
    }

    /// Point `refname` at `oid` in a remote.
    pub fn set_ref(&self, remote: &str, refname: &str, oid: Oid) {
        self.open(remote)
            .reference(refname, oid, true, "test")
            .expect("failed to set ref");
    }

    /// Build a chain in a remote and point a branch at its tip.
    pub fn branch(&self, remote: &str, name: &str, messages: &[&str]) -> Oid {
        let ids = self.chain(remote, messages);
        let tip = *ids.last().expect("at least one commit");
        self.set_ref(remote, &format!("refs/heads/{name}"), tip);
        tip
    }

    /// Build a chain in a remote and point a lightweight tag at its tip.
    pub fn tag(&self, remote: &str, name: &str, messages: &[&str]) -> Oid {
        let ids = self.chain(remote, messages);
        let tip = *ids.last().expect("at least one commit");
        self.set_ref(remote, &format!("refs/tags/{name}"), tip);
        tip
    }

    /// Resolve a ref in a remote.
    pub fn resolve(&self, remote: &str, refname: &str) -> Option<Oid> {
        self.open(remote).refname_to_id(refname).ok()
    }

    /// Names of the local refs under a prefix.
    pub fn local_refs(&self, glob: &str) -> Vec<String> {
        let repo = Repository::open(&self.local).expect("failed to open local");
        let names: Vec<String> = repo
            .references_glob(glob)
            .expect("glob")
            .filter_map(|r| r.ok())
            .filter_map(|r| r.name().ok().map(String::from))
            .collect();
        names
    }

    /// Write the repository config file.
    pub fn write_repo_config(&self, contents: &str) {
        let dir = self.git_dir().join("refmesh");
        std::fs::create_dir_all(&dir).expect("config dir");
        std::fs::write(dir.join("config.toml"), contents).expect("config file");
    }

    /// The local git directory.
    pub fn git_dir(&self) -> PathBuf {
        Repository::open(&self.local)
            .expect("failed to open local")
            .path()
            .to_path_buf()
    }
}
