//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Builds the graph with one update cycle
//! 2. Formats and displays the snapshot
//!
//! # Async
//!
//! The update cycle is async because backend calls run on tokio's blocking
//! pool. Handlers stay synchronous and drive it with a local runtime.

mod layout_cmd;
mod log_cmd;
mod refs_cmd;

pub use layout_cmd::layout;
pub use log_cmd::log;
pub use refs_cmd::refs;

use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::args::Command;
use super::Context;
use crate::engine::{GraphService, GraphSnapshot};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Log { limit } => log(ctx, limit),
        Command::Layout { json, limit } => layout(ctx, json, limit),
        Command::Refs => refs(ctx),
    }
}

/// Build the graph for the repository in `ctx`.
pub(crate) fn load_snapshot(ctx: &Context) -> Result<Arc<GraphSnapshot>> {
    let service = GraphService::new(Arc::new(ctx.backend.clone()), ctx.options.clone());
    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let summary = rt
        .block_on(service.request_update())
        .context("Failed to build commit graph")?;

    tracing::debug!(
        commits = summary.total,
        width = summary.width,
        "graph built"
    );
    Ok(service.snapshot())
}
