//! cli::commands::tags
//!
//! Reconcile tags against the primary remote.
//!
//! Tags carry no ancestry, so there is no symmetric mode: a primary remote
//! is required and its tags win.

use anyhow::Result;

use super::session::Session;
use super::{Context, RunStatus};
use crate::cli::args::RunArgs;
use crate::engine::Policy;

/// Run the tags command.
pub fn tags(ctx: &Context, run: &RunArgs, patterns: &[String]) -> Result<RunStatus> {
    let session = Session::open(ctx, run)?;
    let request = session.request(Policy::AsymmetricTags, patterns)?;

    let report = session.reconcile(&request)?;
    session.finish(std::slice::from_ref(&report))?;

    Ok(RunStatus {
        alerts: report.alert_count(),
        fail_on_alert: run.fail_on_alert,
    })
}
