//! layout command - Print computed positions and edges

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::load_snapshot;
use crate::cli::Context;
use crate::core::layout::{Edge, NodeKind};
use crate::core::types::{Oid, RefName};
use crate::engine::GraphSnapshot;
use crate::ui::output::{self, SHORT_OID_LEN};

/// JSON document emitted by `layout --json`.
#[derive(Debug, Serialize)]
struct LayoutDocument<'a> {
    width: usize,
    head: Option<&'a Oid>,
    commits: Vec<PositionedCommit<'a>>,
    edges: Vec<&'a Edge>,
}

#[derive(Debug, Serialize)]
struct PositionedCommit<'a> {
    oid: &'a Oid,
    row: usize,
    lane: usize,
    kind: NodeKind,
    refs: &'a [RefName],
    summary: &'a str,
}

fn document(snapshot: &GraphSnapshot, limit: Option<usize>) -> LayoutDocument<'_> {
    let commits: Vec<PositionedCommit<'_>> = snapshot
        .ordered_commits()
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .filter_map(|oid| {
            let node = snapshot.position_of(oid)?;
            Some(PositionedCommit {
                oid,
                row: node.row,
                lane: node.lane,
                kind: node.kind,
                refs: snapshot.references_at(oid),
                summary: snapshot.commit(oid).map(|c| c.summary.as_str()).unwrap_or(""),
            })
        })
        .collect();

    let last_row = commits.last().map(|c| c.row).unwrap_or(0);
    LayoutDocument {
        width: snapshot.width(),
        head: snapshot.head().oid.as_ref(),
        edges: snapshot.edges_in_row_range(0, last_row),
        commits,
    }
}

/// Print row, lane and kind of every commit, plus its edges.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `json` - Emit a JSON document instead of a table
/// * `limit` - Maximum number of rows to include
pub fn layout(ctx: &Context, json: bool, limit: Option<usize>) -> Result<()> {
    let snapshot = load_snapshot(ctx)?;
    let doc = document(&snapshot, limit);

    if json {
        let rendered =
            serde_json::to_string_pretty(&doc).context("Failed to serialize layout")?;
        println!("{}", rendered);
        return Ok(());
    }

    output::print(format!("width: {}", doc.width), ctx.verbosity);
    for commit in &doc.commits {
        println!(
            "{:>5} {:>3} {:<6} {}",
            commit.row,
            commit.lane,
            match commit.kind {
                NodeKind::Commit => "commit",
                NodeKind::Stash => "stash",
            },
            commit.oid.short(SHORT_OID_LEN)
        );
    }
    for edge in &doc.edges {
        println!(
            "{} -> {} ({},{}) -> ({},{}) {:?}",
            edge.child.short(SHORT_OID_LEN),
            edge.parent.short(SHORT_OID_LEN),
            edge.from.row,
            edge.from.lane,
            edge.to.row,
            edge.to.lane,
            edge.kind
        );
    }

    Ok(())
}
