//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Alerts and errors only

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Refmesh - converge branches and tags across independent git remotes
#[derive(Parser, Debug)]
#[command(name = "refmesh")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Alerts and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Options shared by every reconciliation command.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to the local repository (bare or with a working tree)
    #[arg(value_name = "REPOSITORY")]
    pub repository: PathBuf,

    /// Remote to synchronize; repeat for each remote, order breaks ties
    #[arg(short, long = "remote", value_name = "REMOTE")]
    pub remotes: Vec<String>,

    /// Authoritative remote
    #[arg(short, long, value_name = "REMOTE")]
    pub primary: Option<String>,

    /// Decide and report without writing to any remote
    #[arg(long)]
    pub dry_run: bool,

    /// Report obsolete refs instead of deleting them
    #[arg(long)]
    pub no_prune: bool,

    /// Worker threads for listing, measuring and pushing
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Exit with status 2 when the run raised alerts
    #[arg(long)]
    pub fail_on_alert: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile branches across remotes
    #[command(
        name = "branches",
        long_about = "Reconcile branches across remotes.\n\n\
            Without --primary every remote is equal: each branch is moved to the \
            most advanced head among the remotes, and branches missing somewhere \
            are created there. Branches that have diverged are reported and left \
            alone.\n\n\
            With --primary that remote is authoritative: secondaries behind it are \
            fast-forwarded, branches it lacks are deleted from secondaries, and \
            secondaries ahead of or diverged from it are reported.",
        after_help = "\
EXAMPLES:
    # Every remote equal, all branches
    refmesh branches . -r origin -r mirror

    # github is authoritative, only release branches
    refmesh branches . -r github -r gitlab -p github -b 'release/*'

    # See what would change
    refmesh branches . -r a -r b --dry-run"
    )]
    Branches {
        #[command(flatten)]
        run: RunArgs,

        /// Branch to synchronize; glob patterns allowed, repeatable
        #[arg(short = 'b', long = "branch", value_name = "PATTERN")]
        branches: Vec<String>,
    },

    /// Reconcile tags against the primary remote
    #[command(
        name = "tags",
        long_about = "Reconcile tags against the primary remote.\n\n\
            Every tag on the primary is pushed to the secondaries, overwriting \
            tags that point elsewhere. Tags the primary lacks are deleted from \
            the secondaries. A primary remote is required.",
        after_help = "\
EXAMPLES:
    refmesh tags . -r github -r gitlab -p github
    refmesh tags . -r github -r gitlab -p github -T 'v2.*' --no-prune"
    )]
    Tags {
        #[command(flatten)]
        run: RunArgs,

        /// Tag to synchronize; glob patterns allowed, repeatable
        #[arg(short = 'T', long = "tag", value_name = "PATTERN")]
        tags: Vec<String>,
    },

    /// Reconcile branches, then tags
    #[command(
        name = "sync",
        long_about = "Reconcile branches, then tags.\n\n\
            --branch implies --branches and --tag implies --tags. Without any of \
            them both namespaces are reconciled. Tags always need --primary.",
        after_help = "\
EXAMPLES:
    refmesh sync . -r github -r gitlab -p github
    refmesh sync . -r a -r b --branches"
    )]
    Sync {
        #[command(flatten)]
        run: RunArgs,

        /// Reconcile branches
        #[arg(long = "branches")]
        all_branches: bool,

        /// Branch to synchronize (implies --branches)
        #[arg(short = 'b', long = "branch", value_name = "PATTERN")]
        branches: Vec<String>,

        /// Reconcile tags
        #[arg(long = "tags")]
        all_tags: bool,

        /// Tag to synchronize (implies --tags)
        #[arg(short = 'T', long = "tag", value_name = "PATTERN")]
        tags: Vec<String>,
    },
}
