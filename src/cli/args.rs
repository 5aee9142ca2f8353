//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lanegraph - Commit graph layout for git repositories
#[derive(Parser, Debug)]
#[command(name = "lanegraph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if lanegraph was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
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

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Draw the commit graph
    #[command(
        name = "log",
        long_about = "Draw the commit graph, one commit per row.\n\n\
            Commits are listed newest first, with children always above their \
            parents. Each lane is one column; branches that diverge get their \
            own lane until they merge back.",
        after_help = "\
EXAMPLES:
    # Whole history reachable from branches, tags and stashes
    lanegraph log

    # Only the 20 most recent rows
    lanegraph log --limit 20

READING THE OUTPUT:
    *   a commit
    =   a stash entry
    |   an edge passing through the row"
    )]
    Log {
        /// Show at most this many rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Print computed positions and edges
    #[command(name = "layout")]
    Layout {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Include at most this many rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// List the references and stashes feeding the graph
    #[command(name = "refs")]
    Refs,
}
