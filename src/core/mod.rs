//! core
//!
//! Core domain types, filtering and configuration for refmesh.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RemoteName, RefName, CommitHash, RemoteSet
//! - [`filter`] - Allow-list matching of ref names
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod filter;
pub mod types;
