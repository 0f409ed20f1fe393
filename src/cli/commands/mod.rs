//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the repository and resolves arguments against the config
//! 2. Calls the engine to run the reconciliation
//! 3. Formats and displays the report
//!
//! Handlers do NOT write to remotes directly.
//!
//! # Exit Status
//!
//! - `0`: the run completed (alerts alone do not fail a run)
//! - `1`: the run could not start, or some writes failed
//! - `2`: the run completed with alerts and `--fail-on-alert` was given

mod branches;
mod session;
mod sync;
mod tags;

pub use branches::branches;
pub use sync::{sync, SyncScope};
pub use tags::tags;

use std::process::ExitCode;

use anyhow::Result;

use crate::cli::args::Command;
use crate::ui::output::Verbosity;

/// Flags that apply to every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    /// Debug logging enabled
    pub debug: bool,
    /// Alerts and errors only
    pub quiet: bool,
}

impl Context {
    /// Output verbosity for these flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

/// Outcome of a command that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStatus {
    /// Alerts raised across all runs of the command
    pub alerts: usize,
    /// `--fail-on-alert` was given
    pub fail_on_alert: bool,
}

impl RunStatus {
    /// The process exit code for this status.
    pub fn exit_code(&self) -> ExitCode {
        if self.fail_on_alert && self.alerts > 0 {
            ExitCode::from(2)
        } else {
            ExitCode::SUCCESS
        }
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<ExitCode> {
    let status = match command {
        Command::Branches { run, branches } => self::branches(ctx, &run, &branches)?,
        Command::Tags { run, tags } => self::tags(ctx, &run, &tags)?,
        Command::Sync {
            run,
            all_branches,
            branches,
            all_tags,
            tags,
        } => {
            let scope = SyncScope::new(all_branches, branches, all_tags, tags);
            self::sync(ctx, &run, &scope)?
        }
    };
    Ok(status.exit_code())
}
