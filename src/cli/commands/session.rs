//! cli::commands::session
//!
//! Shared setup for the reconciliation commands.
//!
//! # Precedence
//!
//! - Remotes: `--remote`, else the repo config `remotes`, else every
//!   remote configured in the repository
//! - Primary: `--primary`, else the repo config `primary`
//! - Patterns: command line, else the repo config `branches` / `tags`
//! - Switches: a command-line flag wins over the global config

use anyhow::{bail, Context as _, Result};

use super::Context;
use crate::cli::args::RunArgs;
use crate::core::config::Config;
use crate::core::filter::RefFilter;
use crate::core::types::{RefKind, RemoteName};
use crate::engine::{
    reconcile, Policy, ReconcileError, ReconcileOptions, ReconcileReport, ReconcileRequest,
};
use crate::git::Git;
use crate::ui::output::{self, ConsoleSink, Verbosity};

/// An opened repository with arguments resolved against its config.
pub(crate) struct Session {
    git: Git,
    config: Config,
    remotes: Vec<RemoteName>,
    primary: Option<RemoteName>,
    options: ReconcileOptions,
    verbosity: Verbosity,
    json: bool,
}

impl Session {
    /// Open the repository named by `run` and resolve its settings.
    pub(crate) fn open(ctx: &Context, run: &RunArgs) -> Result<Self> {
        if !run.repository.exists() {
            bail!("the path {} does not exist", run.repository.display());
        }

        let git = Git::open(&run.repository)?;
        let config = Config::load(Some(git.git_dir()))
            .context("failed to load configuration")?
            .config;

        let remote_names: Vec<String> = if !run.remotes.is_empty() {
            run.remotes.clone()
        } else if !config.remotes().is_empty() {
            config.remotes().to_vec()
        } else {
            git.configured_remotes()?
        };
        let remotes = remote_names
            .into_iter()
            .map(RemoteName::new)
            .collect::<Result<Vec<_>, _>>()?;

        let primary = run
            .primary
            .as_deref()
            .or_else(|| config.primary())
            .map(RemoteName::new)
            .transpose()?;

        if run.jobs == Some(0) {
            output::warn("--jobs 0 runs with a single worker", ctx.verbosity());
        }
        let options = ReconcileOptions {
            dry_run: run.dry_run || config.dry_run(),
            prune: !run.no_prune && config.prune(),
            jobs: run.jobs.unwrap_or_else(|| config.jobs()),
        };

        tracing::debug!(
            git_dir = %git.git_dir().display(),
            remotes = remotes.len(),
            ?options,
            "session opened"
        );

        Ok(Self {
            git,
            config,
            remotes,
            primary,
            options,
            verbosity: ctx.verbosity(),
            json: run.json,
        })
    }

    /// The authoritative remote, if one was given or configured.
    pub(crate) fn primary(&self) -> Option<&RemoteName> {
        self.primary.as_ref()
    }

    /// Build a request for `policy` over the given patterns.
    ///
    /// Empty `patterns` fall back to the configured allow-list for the
    /// policy's ref kind.
    pub(crate) fn request(&self, policy: Policy, patterns: &[String]) -> Result<ReconcileRequest> {
        let patterns = if patterns.is_empty() {
            match policy.kind() {
                RefKind::Branch => self.config.branches(),
                RefKind::Tag => self.config.tags(),
            }
        } else {
            patterns
        };
        let filter = RefFilter::new(patterns)?;

        let mut request = ReconcileRequest::new(policy, self.remotes.clone())
            .with_filter(filter)
            .with_options(self.options);
        if policy.requires_primary() {
            if let Some(primary) = &self.primary {
                request = request.with_primary(primary.clone());
            }
        }
        Ok(request)
    }

    /// Run one reconciliation, printing events as they happen.
    ///
    /// A run whose writes partly failed still prints its summary before
    /// the error is returned.
    pub(crate) fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileReport> {
        let sink = ConsoleSink::new(self.verbosity, self.json);
        match reconcile(&self.git, request, Some(&sink)) {
            Ok(report) => Ok(report),
            Err(ReconcileError::OperationsFailed { failures, report }) => {
                if !self.json {
                    output::print(output::format_summary(&report), self.verbosity);
                } else {
                    self.print_json(&[*report])?;
                }
                bail!("{} operation(s) failed", failures.len())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Print the outcome of one or more runs.
    ///
    /// In JSON mode a single report prints as an object, several as an
    /// array.
    pub(crate) fn finish(&self, reports: &[ReconcileReport]) -> Result<()> {
        if self.json {
            return self.print_json(reports);
        }
        for report in reports {
            output::print(output::format_summary(report), self.verbosity);
        }
        Ok(())
    }

    fn print_json(&self, reports: &[ReconcileReport]) -> Result<()> {
        let rendered = match reports {
            [report] => serde_json::to_string_pretty(report)?,
            _ => serde_json::to_string_pretty(reports)?,
        };
        println!("{}", rendered);
        Ok(())
    }
}
