//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$LANEGRAPH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/lanegraph/config.toml`
//! 3. `~/.lanegraph/config.toml`
//!
//! # Repo Config
//!
//! Located at `lanegraph/config.toml` in the repository's git directory.
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., exclude prefixes must start with `refs/`).

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Log levels accepted in `[log] level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// [graph]
/// remotes = true
/// tags = false
/// stashes = true
/// exclude = ["refs/notes/", "refs/pull/"]
///
/// [log]
/// level = "info"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Which references feed the graph
    pub graph: Option<GraphConfig>,

    /// Logging defaults
    pub log: Option<LogConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(graph) = &self.graph {
            graph.validate()?;
        }
        if let Some(log) = &self.log {
            log.validate()?;
        }
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// [graph]
/// remotes = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Which references feed the graph
    pub graph: Option<GraphConfig>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(graph) = &self.graph {
            graph.validate()?;
        }
        Ok(())
    }
}

/// Reference selection for the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Include remote-tracking branches (default: true)
    pub remotes: Option<bool>,

    /// Include tags (default: true)
    pub tags: Option<bool>,

    /// Include stash entries (default: true)
    pub stashes: Option<bool>,

    /// Ref-name prefixes to leave out (default: `["refs/notes/"]`)
    pub exclude: Option<Vec<String>>,
}

impl GraphConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for prefix in self.exclude.iter().flatten() {
            if !prefix.starts_with("refs/") {
                return Err(ConfigError::InvalidValue(format!(
                    "exclude prefix '{}' must start with 'refs/'",
                    prefix
                )));
            }
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Default log level when `LANEGRAPH_LOG` is unset
    pub level: Option<String>,
}

impl LogConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.level {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid log level '{}', must be one of: {}",
                    level,
                    LOG_LEVELS.join(", ")
                )));
            }
        }
        Ok(())
    }
}
