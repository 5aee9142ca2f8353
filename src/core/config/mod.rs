//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! lanegraph has two configuration scopes:
//! - **Global**: User-level settings
//! - **Repo**: Repository-level overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags and `LANEGRAPH_LOG` (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$LANEGRAPH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/lanegraph/config.toml`
//! 3. `~/.lanegraph/config.toml`
//!
//! # Repo Config Location
//!
//! `lanegraph/config.toml` inside the repository's common git directory
//! (`.git/` for a normal checkout, the repository itself when bare, and the
//! main repository's `.git/` for linked worktrees).
//!
//! # Example
//!
//! ```no_run
//! use lanegraph::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/repo/.git"))).unwrap();
//! println!("Tags: {}", config.tags());
//! println!("Excluded: {:?}", config.exclude());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, GraphConfig, LogConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Ref-name prefixes excluded when nothing is configured.
pub const DEFAULT_EXCLUDE: [&str; 1] = ["refs/notes/"];

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

/// Merged configuration from all sources.
///
/// This struct provides accessor methods that apply precedence rules
/// automatically. Repo config overrides global config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the repo config file (if loaded)
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `git_dir` (the repository's common git directory) is provided,
    /// also loads repo-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(git_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let global_path = Self::find_global();
        let repo_path = git_dir.and_then(Self::find_repo);
        Self::load_files(global_path, repo_path)
    }

    /// Load configuration from explicit files.
    ///
    /// Either file may be absent.
    pub fn load_files(
        global_path: Option<PathBuf>,
        repo_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let global: GlobalConfig = match &global_path {
            Some(path) => Self::read_config(path)?,
            None => GlobalConfig::default(),
        };
        let repo: Option<RepoConfig> = repo_path
            .as_deref()
            .map(Self::read_config)
            .transpose()?;

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        Ok(Config {
            global,
            repo,
            global_path,
            repo_path,
        })
    }

    /// Locate the global config file.
    fn find_global() -> Option<PathBuf> {
        // 1. Check $LANEGRAPH_CONFIG
        if let Ok(path) = std::env::var("LANEGRAPH_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/lanegraph/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("lanegraph/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.lanegraph/config.toml
        dirs::home_dir()
            .map(|home| home.join(".lanegraph/config.toml"))
            .filter(|path| path.exists())
    }

    /// Locate the repo config file.
    fn find_repo(git_dir: &Path) -> Option<PathBuf> {
        Some(Self::repo_config_path(git_dir)).filter(|path| path.exists())
    }

    /// Read and parse a config file.
    fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
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
    ///
    /// Returns `lanegraph/config.toml` inside the given git directory.
    pub fn repo_config_path(git_dir: &Path) -> PathBuf {
        git_dir.join("lanegraph/config.toml")
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Look up a graph setting, repo first.
    fn graph<T>(&self, get: impl Fn(&GraphConfig) -> Option<T>) -> Option<T> {
        self.repo
            .as_ref()
            .and_then(|r| r.graph.as_ref())
            .and_then(&get)
            .or_else(|| self.global.graph.as_ref().and_then(&get))
    }

    /// Check if remote-tracking branches feed the graph.
    ///
    /// Defaults to `true` if not configured.
    pub fn remotes(&self) -> bool {
        self.graph(|g| g.remotes).unwrap_or(true)
    }

    /// Check if tags feed the graph.
    ///
    /// Defaults to `true` if not configured.
    pub fn tags(&self) -> bool {
        self.graph(|g| g.tags).unwrap_or(true)
    }

    /// Check if stash entries feed the graph.
    ///
    /// Defaults to `true` if not configured.
    pub fn stashes(&self) -> bool {
        self.graph(|g| g.stashes).unwrap_or(true)
    }

    /// Get the excluded ref-name prefixes.
    ///
    /// Defaults to [`DEFAULT_EXCLUDE`] if not configured.
    pub fn exclude(&self) -> Vec<String> {
        self.graph(|g| g.exclude.clone())
            .unwrap_or_else(|| DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect())
    }

    /// Get the configured log level.
    ///
    /// Returns `None` if not configured.
    pub fn log_level(&self) -> Option<&str> {
        self.global.log.as_ref().and_then(|l| l.level.as_deref())
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_without_files() {
        let config = Config::load_files(None, None).unwrap();
        assert!(config.remotes());
        assert!(config.tags());
        assert!(config.stashes());
        assert_eq!(config.exclude(), vec!["refs/notes/".to_string()]);
        assert!(config.log_level().is_none());
        assert!(config.global_config_loaded_from().is_none());
    }

    #[test]
    fn load_repo_config() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "lanegraph/config.toml",
            "[graph]\ntags = false\n",
        );

        let path = Config::find_repo(temp.path());
        assert_eq!(path, Some(Config::repo_config_path(temp.path())));

        let config = Config::load_files(None, path).unwrap();
        assert!(!config.tags());
        assert!(config.repo_config_loaded_from().is_some());
    }

    #[test]
    fn missing_repo_config_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(Config::find_repo(temp.path()).is_none());
    }

    #[test]
    fn precedence_repo_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = write(
            temp.path(),
            "global.toml",
            "[graph]\nremotes = false\ntags = false\n[log]\nlevel = \"info\"\n",
        );
        let repo = write(temp.path(), "repo.toml", "[graph]\ntags = true\n");

        let config = Config::load_files(Some(global), Some(repo)).unwrap();
        assert!(!config.remotes());
        assert!(config.tags());
        assert_eq!(config.log_level(), Some("info"));
    }

    #[test]
    fn explicit_empty_exclude_is_kept() {
        let temp = TempDir::new().unwrap();
        let global = write(temp.path(), "global.toml", "[graph]\nexclude = []\n");

        let config = Config::load_files(Some(global), None).unwrap();
        assert!(config.exclude().is_empty());
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let repo = write(temp.path(), "repo.toml", "trunk = \"main\"\n");

        let err = Config::load_files(None, Some(repo)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn invalid_value_rejected() {
        let temp = TempDir::new().unwrap();
        let global = write(temp.path(), "global.toml", "[log]\nlevel = \"chatty\"\n");

        let err = Config::load_files(Some(global), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
