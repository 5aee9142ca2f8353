//! log command - Draw the commit graph

use anyhow::Result;

use super::load_snapshot;
use crate::cli::Context;
use crate::ui::output;

/// Draw the commit graph, newest first.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `limit` - Maximum number of rows to print
pub fn log(ctx: &Context, limit: Option<usize>) -> Result<()> {
    let snapshot = load_snapshot(ctx)?;

    if snapshot.is_empty() {
        output::warn("no commits reachable from any reference", ctx.verbosity);
        return Ok(());
    }

    let rows = snapshot
        .ordered_commits()
        .iter()
        .take(limit.unwrap_or(usize::MAX));
    for oid in rows {
        if let Some(node) = snapshot.position_of(oid) {
            println!("{}", output::format_row(&snapshot, node, oid));
        }
    }

    Ok(())
}
