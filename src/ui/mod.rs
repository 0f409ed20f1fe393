//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Verbosity, message helpers and the console event sink
//!
//! # Design
//!
//! All terminal output goes through this module. Routine progress goes to
//! stdout; alerts and errors go to stderr so pipelines can alarm on them
//! without parsing progress lines.

pub mod output;
