//! cli::commands::sync
//!
//! Reconcile branches, then tags, in one invocation.
//!
//! # Design
//!
//! `--branch` implies `--branches` and `--tag` implies `--tags`. When no
//! namespace is selected both are reconciled. Both runs share one session
//! so the repository and config are resolved once.
//!
//! A failed branch run stops the command; tags are not attempted.
//!
//! # Example
//!
//! ```bash
//! # Branches and tags, github authoritative
//! refmesh sync . -r github -r gitlab -p github
//!
//! # Only tags matching v2.*
//! refmesh sync . -r github -r gitlab -p github -T 'v2.*'
//! ```

use anyhow::Result;

use super::session::Session;
use super::{branches, Context, RunStatus};
use crate::cli::args::RunArgs;
use crate::engine::Policy;

/// Which namespaces a sync covers, with their patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncScope {
    /// Reconcile branches
    pub branches: bool,
    /// Branch patterns (empty: configured or all)
    pub branch_patterns: Vec<String>,
    /// Reconcile tags
    pub tags: bool,
    /// Tag patterns (empty: configured or all)
    pub tag_patterns: Vec<String>,
}

impl SyncScope {
    /// Resolve the command-line selection.
    pub fn new(
        all_branches: bool,
        branch_patterns: Vec<String>,
        all_tags: bool,
        tag_patterns: Vec<String>,
    ) -> Self {
        let mut branches = all_branches || !branch_patterns.is_empty();
        let mut tags = all_tags || !tag_patterns.is_empty();
        if !branches && !tags {
            branches = true;
            tags = true;
        }
        Self {
            branches,
            branch_patterns,
            tags,
            tag_patterns,
        }
    }
}

/// Run the sync command.
pub fn sync(ctx: &Context, run: &RunArgs, scope: &SyncScope) -> Result<RunStatus> {
    let session = Session::open(ctx, run)?;

    let mut requests = Vec::new();
    if scope.branches {
        requests.push(session.request(branches::policy(&session), &scope.branch_patterns)?);
    }
    if scope.tags {
        requests.push(session.request(Policy::AsymmetricTags, &scope.tag_patterns)?);
    }
    // Both requests must be valid before any remote is touched.
    for request in &requests {
        request.validate()?;
    }

    let mut reports = Vec::with_capacity(requests.len());
    for request in &requests {
        reports.push(session.reconcile(request)?);
    }
    session.finish(&reports)?;

    Ok(RunStatus {
        alerts: reports.iter().map(|r| r.alert_count()).sum(),
        fail_on_alert: run.fail_on_alert,
    })
}
