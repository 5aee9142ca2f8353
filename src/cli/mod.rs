//! cli
//!
//! Command-line interface layer for lanegraph.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and set up logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It opens the repository, builds a graph through
//! the [`crate::engine`], and hands the resulting snapshot to a formatter.
//! It never writes to the repository.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::backend::GitBackend;
use crate::core::config::Config;
use crate::engine::GraphOptions;
use crate::git::Git;
use crate::ui::output::Verbosity;

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "LANEGRAPH_LOG";

/// Level used when nothing else is configured.
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Everything a command handler needs.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory the repository was discovered from
    pub cwd: PathBuf,
    /// Repository backend
    pub backend: GitBackend,
    /// Reference selection
    pub options: GraphOptions,
    /// Output verbosity
    pub verbosity: Verbosity,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let cwd = match cli.cwd.clone() {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let git = Git::open(&cwd).context("Failed to open repository")?;
    let config = Config::load(Some(git.common_dir())).context("Failed to load configuration")?;

    init_logging(cli.debug, config.log_level());
    tracing::debug!(
        cwd = %cwd.display(),
        global = ?config.global_config_loaded_from(),
        repo = ?config.repo_config_loaded_from(),
        "configuration loaded"
    );

    let ctx = Context {
        cwd,
        backend: GitBackend::new(git),
        options: GraphOptions::from_config(&config),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Pick the tracing filter: `--debug`, then `LANEGRAPH_LOG`, then config.
fn log_filter(debug: bool, env: Option<String>, configured: Option<&str>) -> String {
    if debug {
        return "debug".to_string();
    }
    env.filter(|value| !value.trim().is_empty())
        .or_else(|| configured.map(str::to_ascii_lowercase))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Install the global tracing subscriber, writing to stderr.
fn init_logging(debug: bool, configured: Option<&str>) {
    let directive = log_filter(debug, std::env::var(LOG_ENV).ok(), configured);
    let filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    // A subscriber may already be installed when running embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
