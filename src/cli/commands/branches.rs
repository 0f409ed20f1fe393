//! cli::commands::branches
//!
//! Reconcile branches across remotes.
//!
//! # Design
//!
//! The policy follows from the primary: with one (given or configured) the
//! primary is authoritative, without one every remote is equal.
//!
//! # Example
//!
//! ```bash
//! # Every remote equal
//! refmesh branches . -r origin -r mirror
//!
//! # github is authoritative, release branches only
//! refmesh branches . -r github -r gitlab -p github -b 'release/*'
//! ```

use anyhow::Result;

use super::session::Session;
use super::{Context, RunStatus};
use crate::cli::args::RunArgs;
use crate::engine::Policy;

/// The branch policy for a session.
pub(crate) fn policy(session: &Session) -> Policy {
    if session.primary().is_some() {
        Policy::AsymmetricBranches
    } else {
        Policy::SymmetricBranches
    }
}

/// Run the branches command.
pub fn branches(ctx: &Context, run: &RunArgs, patterns: &[String]) -> Result<RunStatus> {
    let session = Session::open(ctx, run)?;
    let request = session.request(policy(&session), patterns)?;

    let report = session.reconcile(&request)?;
    session.finish(std::slice::from_ref(&report))?;

    Ok(RunStatus {
        alerts: report.alert_count(),
        fail_on_alert: run.fail_on_alert,
    })
}
