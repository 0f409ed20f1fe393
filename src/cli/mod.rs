//! cli
//!
//! Command-line interface layer for refmesh.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Initialize logging
//! - Delegate to command handlers
//! - Does NOT talk to remotes directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, resolves them
//! against the configuration and hands a request to [`crate::engine`].

pub mod args;
pub mod commands;

pub use args::Cli;

use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    init_logging(cli.debug);

    let ctx = commands::Context {
        debug: cli.debug,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--debug`.
///
/// Events already reach the terminal through the console sink, so the
/// default filter only lets errors through.
fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "refmesh=debug" } else { "error" }));

    // A subscriber may already be installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
