//! Refmesh - converge branches and tags across independent git remotes
//!
//! Refmesh keeps N remotes of the same repository in agreement. It lists
//! every remote's refs, measures how far each head is from the others,
//! decides per ref what should change, and pushes or deletes accordingly.
//! Anything that would need a merge is reported, never resolved.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Runs Inventory → Measure → Decide → Execute for one policy
//! - [`core`] - Domain types, name filtering and configuration
//! - [`git`] - The repository gateway: the single interface to git
//! - [`ui`] - Console output
//!
//! # Policies
//!
//! - Symmetric branches: no authority, the most advanced head wins
//! - Asymmetric branches: the primary remote is authoritative
//! - Asymmetric tags: the primary remote's tags overwrite the others
//!
//! # Correctness Invariants
//!
//! 1. No remote is written before every decision of the run is known
//! 2. Branches are only ever fast-forwarded; diverged refs are left alone
//! 3. The primary remote is never written in asymmetric runs
//! 4. A run over converged remotes performs no writes

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod ui;
