//! engine::inventory
//!
//! Per-remote ref inventory.
//!
//! # Design
//!
//! Building the inventory has two phases, each fanned out over the worker
//! pool: list every remote, then fetch every listed (and accepted) ref
//! into the local repository in one batched request per remote. Any
//! failure aborts the whole build; a partial inventory would silently
//! suppress decisions for the missing remote's refs.
//!
//! The result is an immutable [`RemoteRefTable`] snapshot.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use tracing::debug;

use crate::core::filter::RefFilter;
use crate::core::types::{CommitHash, RefKind, RefName, RemoteName, RemoteSet};
use crate::git::{GatewayError, RemoteRefs, RepositoryGateway};

/// Every remote's refs of one kind, frozen for the rest of the run.
///
/// A remote without a given ref simply lacks the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRefTable {
    kind: RefKind,
    remotes: RemoteSet,
    refs: BTreeMap<RemoteName, RemoteRefs>,
}

impl RemoteRefTable {
    /// Assemble a table from already listed refs.
    ///
    /// Remotes absent from `refs` hold nothing; entries for remotes outside
    /// the set are dropped.
    pub fn new(kind: RefKind, remotes: RemoteSet, mut refs: BTreeMap<RemoteName, RemoteRefs>) -> Self {
        refs.retain(|remote, _| remotes.contains(remote));
        for remote in &remotes {
            refs.entry(remote.clone()).or_default();
        }
        Self {
            kind,
            remotes,
            refs,
        }
    }

    /// Namespace of the table.
    pub fn kind(&self) -> RefKind {
        self.kind
    }

    /// Remotes in caller order.
    pub fn remotes(&self) -> &RemoteSet {
        &self.remotes
    }

    /// One remote's refs.
    pub fn refs(&self, remote: &RemoteName) -> Option<&RemoteRefs> {
        self.refs.get(remote)
    }

    /// The hash a remote holds for a ref.
    pub fn hash(&self, remote: &RemoteName, name: &RefName) -> Option<&CommitHash> {
        self.refs.get(remote).and_then(|refs| refs.get(name))
    }

    /// Every ref name held by at least one remote, sorted.
    pub fn names(&self) -> BTreeSet<&RefName> {
        self.refs.values().flat_map(|refs| refs.keys()).collect()
    }

    /// Each remote's hash for a ref, in caller order.
    pub fn heads(&self, name: &RefName) -> Vec<Option<CommitHash>> {
        self.remotes
            .iter()
            .map(|remote| self.hash(remote, name).cloned())
            .collect()
    }
}

/// List and fetch the refs of one kind on every remote.
///
/// Only refs accepted by `filter` enter the table or get fetched.
///
/// # Errors
///
/// The first listing or fetch failure, after which nothing else is used.
pub fn build<G>(
    gateway: &G,
    remotes: &RemoteSet,
    kind: RefKind,
    filter: &RefFilter,
    pool: &rayon::ThreadPool,
) -> Result<RemoteRefTable, GatewayError>
where
    G: RepositoryGateway + ?Sized,
{
    let listed: Vec<(RemoteName, RemoteRefs)> = pool.install(|| {
        remotes
            .as_slice()
            .par_iter()
            .map(|remote| -> Result<(RemoteName, RemoteRefs), GatewayError> {
                let mut refs = gateway.list_refs(remote, kind)?;
                refs.retain(|name, _| filter.accepts(name.as_str()));
                debug!(%remote, %kind, count = refs.len(), "inventory");
                Ok((remote.clone(), refs))
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    pool.install(|| {
        listed.par_iter().try_for_each(|(remote, refs)| {
            let names: Vec<RefName> = refs.keys().cloned().collect();
            gateway.fetch(remote, kind, &names)
        })
    })?;

    Ok(RemoteRefTable::new(kind, remotes.clone(), listed.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::mock::{FailOn, MockGateway, MockOperation};

    fn remote(name: &str) -> RemoteName {
        RemoteName::new(name).unwrap()
    }

    fn refname(name: &str) -> RefName {
        RefName::new(name).unwrap()
    }

    fn commit(hash: &str) -> CommitHash {
        CommitHash::new(hash).unwrap()
    }

    fn pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    fn remotes() -> RemoteSet {
        RemoteSet::new([remote("a"), remote("b")]).unwrap()
    }

    fn gateway() -> MockGateway {
        MockGateway::new()
            .with_commit(&commit("c1"), &[])
            .with_ref(&remote("a"), RefKind::Branch, &refname("main"), &commit("c1"))
            .with_ref(&remote("a"), RefKind::Branch, &refname("release-1"), &commit("c1"))
            .with_ref(&remote("b"), RefKind::Branch, &refname("main"), &commit("c1"))
    }

    #[test]
    fn builds_table_and_fetches_listed_refs() {
        let gateway = gateway();
        let table = build(&gateway, &remotes(), RefKind::Branch, &RefFilter::accept_all(), &pool())
            .unwrap();

        assert_eq!(table.names().len(), 2);
        assert_eq!(table.hash(&remote("b"), &refname("main")), Some(&commit("c1")));
        assert_eq!(
            table.heads(&refname("release-1")),
            vec![Some(commit("c1")), None]
        );

        let fetches: Vec<_> = gateway
            .operations()
            .into_iter()
            .filter(|op| matches!(op, MockOperation::Fetch { .. }))
            .collect();
        assert_eq!(fetches.len(), 2);
    }

    #[test]
    fn filter_limits_listing_and_fetch() {
        let gateway = gateway();
        let filter = RefFilter::new(["release-*"]).unwrap();
        let table = build(&gateway, &remotes(), RefKind::Branch, &filter, &pool()).unwrap();

        assert_eq!(table.names().into_iter().cloned().collect::<Vec<_>>(), vec![refname("release-1")]);
        assert!(gateway.operations().contains(&MockOperation::Fetch {
            remote: remote("a"),
            kind: RefKind::Branch,
            names: vec![refname("release-1")],
        }));
    }

    #[test]
    fn listing_failure_aborts_before_fetch() {
        let gateway = gateway().fail_on(FailOn::ListRefs(remote("b")));
        let result = build(&gateway, &remotes(), RefKind::Branch, &RefFilter::accept_all(), &pool());

        assert!(matches!(result, Err(GatewayError::ListFailed { .. })));
        assert!(!gateway
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::Fetch { .. })));
    }

    #[test]
    fn fetch_failure_aborts() {
        let gateway = gateway().fail_on(FailOn::Fetch(remote("a")));
        let result = build(&gateway, &remotes(), RefKind::Branch, &RefFilter::accept_all(), &pool());
        assert!(matches!(result, Err(GatewayError::FetchFailed { .. })));
    }

    #[test]
    fn table_ignores_foreign_remotes() {
        let mut refs = BTreeMap::new();
        refs.insert(remote("zzz"), RemoteRefs::new());
        let table = RemoteRefTable::new(RefKind::Tag, remotes(), refs);
        assert!(table.refs(&remote("zzz")).is_none());
        assert!(table.refs(&remote("a")).unwrap().is_empty());
    }
}
