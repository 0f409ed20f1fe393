//! End-to-end reconciliation scenarios against the in-memory gateway.
//!
//! Each scenario builds a commit graph and a set of remotes, runs one
//! policy, and checks both the decisions and the resulting remote state.

use refmesh::core::filter::RefFilter;
use refmesh::core::types::{CommitHash, RefKind, RefName, RemoteName};
use refmesh::engine::{
    reconcile, Decision, Event, EventCollector, EventSink, Policy, ReconcileOptions, ReconcileReport,
    ReconcileRequest, Severity,
};
use refmesh::git::mock::{FailOn, MockGateway, MockOperation};

fn remote(name: &str) -> RemoteName {
    RemoteName::new(name).unwrap()
}

fn refname(name: &str) -> RefName {
    RefName::new(name).unwrap()
}

fn commit(hash: &str) -> CommitHash {
    CommitHash::new(hash).unwrap()
}

fn remotes(names: &[&str]) -> Vec<RemoteName> {
    names.iter().map(|n| remote(n)).collect()
}

/// Linear history c1 <- c2 <- c3, plus x2 and y2 branching off c1.
fn history() -> MockGateway {
    MockGateway::new()
        .with_commit(&commit("c1"), &[])
        .with_commit(&commit("c2"), &[&commit("c1")])
        .with_commit(&commit("c3"), &[&commit("c2")])
        .with_commit(&commit("x2"), &[&commit("c1")])
        .with_commit(&commit("y2"), &[&commit("c1")])
}

fn branch(gateway: MockGateway, remote_name: &str, name: &str, hash: &str) -> MockGateway {
    gateway.with_ref(&remote(remote_name), RefKind::Branch, &refname(name), &commit(hash))
}

fn tag(gateway: MockGateway, remote_name: &str, name: &str, hash: &str) -> MockGateway {
    gateway.with_ref(&remote(remote_name), RefKind::Tag, &refname(name), &commit(hash))
}

fn head(gateway: &MockGateway, remote_name: &str, kind: RefKind, name: &str) -> Option<CommitHash> {
    gateway.ref_hash(&remote(remote_name), kind, &refname(name))
}

fn run(gateway: &MockGateway, request: &ReconcileRequest) -> ReconcileReport {
    reconcile(gateway, request, None).expect("run failed")
}

mod symmetric {
    use super::*;

    #[test]
    fn every_remote_reaches_the_most_advanced_head() {
        let gateway = history();
        let gateway = branch(gateway, "a", "main", "c1");
        let gateway = branch(gateway, "b", "main", "c3");
        let gateway = branch(gateway, "c", "main", "c2");
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b", "c"]));

        let report = run(&gateway, &request);

        assert_eq!(report.applied.len(), 2);
        for r in ["a", "b", "c"] {
            assert_eq!(head(&gateway, r, RefKind::Branch, "main"), Some(commit("c3")));
        }
    }

    #[test]
    fn second_run_writes_nothing() {
        let gateway = history();
        let gateway = branch(gateway, "a", "main", "c3");
        let gateway = branch(gateway, "b", "feature", "x2");
        let gateway = gateway.with_remote(&remote("c"));
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b", "c"]));

        run(&gateway, &request);
        gateway.clear_operations();
        let second = run(&gateway, &request);

        assert!(second.is_converged());
        assert!(gateway.writes().is_empty());
    }

    #[test]
    fn externally_deleted_branch_is_recreated() {
        let gateway = history();
        let gateway = branch(gateway, "a", "main", "c2");
        let gateway = gateway.with_remote(&remote("b"));
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b"]));

        run(&gateway, &request);
        gateway.remove_ref(&remote("b"), RefKind::Branch, &refname("main"));
        let second = run(&gateway, &request);

        assert_eq!(second.applied.len(), 1);
        assert_eq!(head(&gateway, "b", RefKind::Branch, "main"), Some(commit("c2")));
    }

    #[test]
    fn ties_fan_out_from_the_first_remote() {
        let gateway = history();
        let gateway = branch(gateway, "a", "main", "c2");
        let gateway = branch(gateway, "b", "main", "c2");
        let gateway = branch(gateway, "c", "main", "c1");
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b", "c"]));

        let report = run(&gateway, &request);

        let writes: Vec<&Decision> = report.decisions.iter().filter(|d| d.target().is_some()).collect();
        assert_eq!(writes.len(), 1);
        assert!(matches!(
            writes[0],
            Decision::Converge { target, source, behind: 1, .. }
                if target == &remote("c") && source == &remote("a")
        ));
    }

    #[test]
    fn missing_branches_are_created_not_deleted() {
        let gateway = history();
        let gateway = branch(gateway, "a", "only-a", "c1");
        let gateway = gateway.with_remote(&remote("b"));
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b"]));

        let report = run(&gateway, &request);

        assert!(report.applied.iter().all(|op| !op.is_delete()));
        assert_eq!(head(&gateway, "b", RefKind::Branch, "only-a"), Some(commit("c1")));
    }

    #[test]
    fn diverged_branch_blocks_every_write_for_that_name() {
        // develop: a and b diverged, c behind both
        let gateway = history();
        let gateway = branch(gateway, "a", "develop", "x2");
        let gateway = branch(gateway, "b", "develop", "y2");
        let gateway = branch(gateway, "c", "develop", "c1");
        let gateway = branch(gateway, "c", "main", "c1");
        let gateway = branch(gateway, "a", "main", "c2");
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b", "c"]));

        let report = run(&gateway, &request);

        assert_eq!(head(&gateway, "c", RefKind::Branch, "develop"), Some(commit("c1")));
        assert!(report
            .applied
            .iter()
            .all(|op| op.name == refname("main")));
        let conflicts: Vec<&Decision> = report.conflicts().collect();
        assert_eq!(conflicts.len(), 1);
        assert!(matches!(
            conflicts[0],
            Decision::Conflict { left, right, ahead: 1, behind: 1, .. }
                if left == &remote("a") && right == &remote("b")
        ));
    }

    #[test]
    fn lagging_pair_follows_the_single_leader() {
        let gateway = history();
        let gateway = branch(gateway, "a", "main", "c1");
        let gateway = branch(gateway, "b", "main", "c1");
        let gateway = branch(gateway, "c", "main", "c2");
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b", "c"]));

        let report = run(&gateway, &request);

        let targets: Vec<&RemoteName> = report.decisions.iter().filter_map(|d| d.target()).collect();
        assert_eq!(targets, vec![&remote("a"), &remote("b")]);
        assert!(report.decisions.iter().all(|d| match d {
            Decision::Converge { source, hash, .. } => source == &remote("c") && hash == &commit("c2"),
            _ => false,
        }));
    }

    #[test]
    fn mutually_diverged_remotes_hold_back_the_laggard() {
        // first: c2; second and third each two commits off c1, diverged from
        // first and from each other
        let gateway = history()
            .with_commit(&commit("s2"), &[&commit("c1")])
            .with_commit(&commit("s3"), &[&commit("s2")])
            .with_commit(&commit("t2"), &[&commit("c1")])
            .with_commit(&commit("t3"), &[&commit("t2")]);
        let gateway = branch(gateway, "first", "develop", "c2");
        let gateway = branch(gateway, "second", "develop", "s3");
        let gateway = branch(gateway, "third", "develop", "t3");
        let request = ReconcileRequest::new(
            Policy::SymmetricBranches,
            remotes(&["first", "second", "third"]),
        );

        let report = run(&gateway, &request);

        assert!(gateway.writes().is_empty());
        assert!(report.conflicts().any(|d| matches!(
            d,
            Decision::Conflict { left, right, ahead: 2, behind: 2, .. }
                if left == &remote("second") && right == &remote("third")
        )));
        assert!(report.conflicts().any(|d| matches!(
            d,
            Decision::Conflict { left, right, ahead: 1, behind: 2, .. }
                if left == &remote("first") && right == &remote("second")
        )));
    }

    #[test]
    fn branch_pushes_are_not_forced() {
        let gateway = history();
        let gateway = branch(gateway, "a", "main", "c2");
        let gateway = branch(gateway, "b", "main", "c1");
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b"]));

        run(&gateway, &request);

        assert!(gateway
            .writes()
            .iter()
            .all(|op| matches!(op, MockOperation::Push { force: false, .. })));
    }
}

mod asymmetric_branches {
    use super::*;

    fn request(names: &[&str]) -> ReconcileRequest {
        ReconcileRequest::new(Policy::AsymmetricBranches, remotes(names)).with_primary(remote(names[0]))
    }

    #[test]
    fn primary_is_never_a_target() {
        let gateway = history();
        let gateway = branch(gateway, "p", "main", "c1");
        let gateway = branch(gateway, "s", "main", "c3");
        let gateway = branch(gateway, "s", "extra", "c1");
        let gateway = branch(gateway, "t", "main", "x2");

        let report = run(&gateway, &request(&["p", "s", "t"]));

        assert!(gateway.writes().iter().all(|op| !matches!(
            op,
            MockOperation::Push { remote, .. } | MockOperation::Delete { remote, .. }
                if remote.as_str() == "p"
        )));
        assert_eq!(head(&gateway, "p", RefKind::Branch, "main"), Some(commit("c1")));
        assert!(report.alert_count() >= 1);
    }

    #[test]
    fn primary_defines_which_branches_exist() {
        let gateway = history();
        let gateway = branch(gateway, "p", "main", "c1");
        let gateway = branch(gateway, "s", "main", "c1");
        let gateway = branch(gateway, "s", "gone", "c2");
        let gateway = branch(gateway, "t", "gone", "c3");

        run(&gateway, &request(&["p", "s", "t"]));

        assert!(head(&gateway, "s", RefKind::Branch, "gone").is_none());
        assert!(head(&gateway, "t", RefKind::Branch, "gone").is_none());
        assert_eq!(head(&gateway, "t", RefKind::Branch, "main"), Some(commit("c1")));
    }

    #[test]
    fn no_silent_merge_when_a_secondary_diverged() {
        let gateway = history();
        let gateway = branch(gateway, "p", "main", "x2");
        let gateway = branch(gateway, "s", "main", "y2");
        let gateway = gateway.with_remote(&remote("t"));

        let report = run(&gateway, &request(&["p", "s", "t"]));

        assert!(gateway.writes().is_empty());
        assert!(head(&gateway, "t", RefKind::Branch, "main").is_none());
        assert_eq!(report.alert_count(), 1);
    }

    #[test]
    fn ahead_secondary_raises_an_alert() {
        let gateway = history();
        let gateway = branch(gateway, "p", "main", "c1");
        let gateway = branch(gateway, "s", "main", "c3");

        let report = run(&gateway, &request(&["p", "s"]));

        assert!(gateway.writes().is_empty());
        let alert = report.events.iter().find(|e| e.is_alert()).unwrap();
        assert!(alert.message.contains("is 2 commits ahead"), "{}", alert.message);
    }

    #[test]
    fn prune_disabled_reports_deletes() {
        let gateway = history();
        let gateway = branch(gateway, "p", "main", "c1");
        let gateway = branch(gateway, "s", "main", "c1");
        let gateway = branch(gateway, "s", "old", "c1");
        let request = request(&["p", "s"]).with_options(ReconcileOptions {
            prune: false,
            ..Default::default()
        });

        let report = run(&gateway, &request);

        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].is_delete());
        assert!(head(&gateway, "s", RefKind::Branch, "old").is_some());
    }

    #[test]
    fn filter_protects_out_of_scope_names() {
        let gateway = history();
        let gateway = branch(gateway, "p", "release-1", "c2");
        let gateway = branch(gateway, "s", "release-1", "c1");
        let gateway = branch(gateway, "s", "wip", "c1");
        let request = request(&["p", "s"]).with_filter(RefFilter::new(["release-*"]).unwrap());

        run(&gateway, &request);

        assert_eq!(head(&gateway, "s", RefKind::Branch, "release-1"), Some(commit("c2")));
        assert_eq!(head(&gateway, "s", RefKind::Branch, "wip"), Some(commit("c1")));
    }
}

mod asymmetric_tags {
    use super::*;

    fn request() -> ReconcileRequest {
        ReconcileRequest::new(Policy::AsymmetricTags, remotes(&["p", "s"])).with_primary(remote("p"))
    }

    #[test]
    fn tags_follow_primary_with_forced_pushes() {
        let gateway = history();
        let gateway = tag(gateway, "p", "v1", "c1");
        let gateway = tag(gateway, "p", "v2", "c2");
        let gateway = tag(gateway, "s", "v1", "x2");
        let gateway = tag(gateway, "s", "v0", "c1");

        let report = run(&gateway, &request());

        assert_eq!(report.applied.len(), 3);
        assert_eq!(head(&gateway, "s", RefKind::Tag, "v1"), Some(commit("c1")));
        assert_eq!(head(&gateway, "s", RefKind::Tag, "v2"), Some(commit("c2")));
        assert!(head(&gateway, "s", RefKind::Tag, "v0").is_none());
        assert!(gateway
            .writes()
            .iter()
            .filter(|op| matches!(op, MockOperation::Push { .. }))
            .all(|op| matches!(op, MockOperation::Push { force: true, .. })));
    }

    #[test]
    fn tags_never_query_ancestry() {
        let gateway = history();
        let gateway = tag(gateway, "p", "v1", "c3");
        let gateway = tag(gateway, "s", "v1", "c1");

        run(&gateway, &request());

        assert!(!gateway
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::Distance { .. })));
    }

    #[test]
    fn dry_run_announces_without_writing() {
        let gateway = history();
        let gateway = tag(gateway, "p", "v1", "c1");
        let gateway = gateway.with_remote(&remote("s"));
        let sink = EventCollector::new();
        let request = request().with_options(ReconcileOptions {
            dry_run: true,
            ..Default::default()
        });

        let report = reconcile(&gateway, &request, Some(&sink)).unwrap();

        assert!(gateway.writes().is_empty());
        assert_eq!(report.skipped.len(), 1);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Info);
        assert!(events[0].message.starts_with("Create s:refs/tags/v1"));
    }
}

mod failures {
    use super::*;

    #[test]
    fn fetch_failure_aborts_before_any_write() {
        let gateway = history();
        let gateway = branch(gateway, "a", "main", "c2");
        let gateway = branch(gateway, "b", "main", "c1");
        let gateway = gateway.fail_on(FailOn::Fetch(remote("b")));
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b"]));

        assert!(reconcile(&gateway, &request, None).is_err());
        assert!(gateway.writes().is_empty());
    }

    #[test]
    fn failed_push_does_not_stop_other_remotes() {
        let gateway = history();
        let gateway = branch(gateway, "a", "main", "c2");
        let gateway = branch(gateway, "b", "main", "c1");
        let gateway = branch(gateway, "c", "main", "c1");
        let gateway = gateway.fail_on(FailOn::Push(remote("b")));
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b", "c"]));

        let err = reconcile(&gateway, &request, None).unwrap_err();

        let report = err.report().expect("report attached");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(head(&gateway, "c", RefKind::Branch, "main"), Some(commit("c2")));
        assert_eq!(head(&gateway, "b", RefKind::Branch, "main"), Some(commit("c1")));
    }

    #[test]
    fn rerun_after_recovery_finishes_the_job() {
        let gateway = history();
        let gateway = branch(gateway, "a", "main", "c2");
        let gateway = branch(gateway, "b", "main", "c1");
        let gateway = gateway.fail_on(FailOn::Push(remote("b")));
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b"]));

        assert!(reconcile(&gateway, &request, None).is_err());
        gateway.clear_fail_on();
        let report = run(&gateway, &request);

        assert_eq!(report.applied.len(), 1);
        assert_eq!(head(&gateway, "b", RefKind::Branch, "main"), Some(commit("c2")));
    }
}

mod report {
    use super::*;

    struct Clock(std::sync::Mutex<Vec<chrono::DateTime<chrono::Utc>>>);

    impl EventSink for Clock {
        fn emit(&self, _event: &Event) {
            self.0.lock().unwrap().push(chrono::Utc::now());
        }
    }

    #[test]
    fn started_at_precedes_the_first_event() {
        let gateway = history();
        let gateway = branch(gateway, "a", "main", "c2");
        let gateway = branch(gateway, "b", "main", "c1");
        let request = ReconcileRequest::new(Policy::SymmetricBranches, remotes(&["a", "b"]));
        let clock = Clock(std::sync::Mutex::new(Vec::new()));

        let report = reconcile(&gateway, &request, Some(&clock)).unwrap();

        let seen = clock.0.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(report.started_at <= seen[0]);
    }
}
