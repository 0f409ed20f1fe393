//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! refmesh has two configuration scopes:
//! - **Global**: User-level run settings (dry run, prune, parallelism)
//! - **Repo**: Which remotes to reconcile, the primary, and allow-lists
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Example
//!
//! ```no_run
//! use refmesh::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/srv/mirror.git"))).unwrap();
//! let config = result.config;
//!
//! println!("Remotes: {:?}", config.remotes());
//! println!("Dry run: {}", config.dry_run());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default worker count for listing, distance queries and pushes.
pub const DEFAULT_JOBS: usize = 4;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if present)
    pub repo: Option<RepoConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the repo config file (if loaded)
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// `git_dir` is the repository's git directory (the repository itself
    /// for bare repositories). When given, repo config is loaded from it.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(git_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let (global, global_path) = Self::load_global()?;

        let (repo, repo_path) = match git_dir {
            Some(dir) => {
                let path = Self::repo_config_path(dir);
                if path.exists() {
                    (Some(Self::read_config::<RepoConfig>(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                repo,
                global_path,
                repo_path,
            },
        })
    }

    /// Load global configuration from standard locations.
    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        // 1. Check $REFMESH_CONFIG
        if let Ok(path) = std::env::var("REFMESH_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 2. Check $XDG_CONFIG_HOME/refmesh/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("refmesh/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.refmesh/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".refmesh/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    fn read_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for repo config.
    pub fn repo_config_path(git_dir: &Path) -> PathBuf {
        git_dir.join("refmesh/config.toml")
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Configured remotes, in tie-break order. Empty if not configured.
    pub fn remotes(&self) -> &[String] {
        self.repo
            .as_ref()
            .and_then(|r| r.remotes.as_deref())
            .unwrap_or(&[])
    }

    /// Configured primary remote.
    pub fn primary(&self) -> Option<&str> {
        self.repo.as_ref().and_then(|r| r.primary.as_deref())
    }

    /// Configured branch allow-list. Empty means all branches.
    pub fn branches(&self) -> &[String] {
        self.repo
            .as_ref()
            .and_then(|r| r.branches.as_deref())
            .unwrap_or(&[])
    }

    /// Configured tag allow-list. Empty means all tags.
    pub fn tags(&self) -> &[String] {
        self.repo
            .as_ref()
            .and_then(|r| r.tags.as_deref())
            .unwrap_or(&[])
    }

    /// Check if runs should only report.
    ///
    /// Defaults to `false` if not configured.
    pub fn dry_run(&self) -> bool {
        self.global.dry_run.unwrap_or(false)
    }

    /// Check if delete decisions should be executed.
    ///
    /// Defaults to `true` if not configured.
    pub fn prune(&self) -> bool {
        self.global.prune.unwrap_or(true)
    }

    /// Worker count.
    ///
    /// Defaults to [`DEFAULT_JOBS`] if not configured.
    pub fn jobs(&self) -> usize {
        self.global.jobs.unwrap_or(DEFAULT_JOBS)
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}
