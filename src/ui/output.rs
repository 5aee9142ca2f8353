//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! Graph rows are drawn one character per lane:
//!
//! ```text
//! *  3f2a1c9 (main) Merge feature
//! *| 8b0e4d2 Fix typo
//! |* 77c1a05 (feature) Add feature
//! *  c04e9b1 Initial commit
//! ```
//!
//! `*` is a commit, `=` a stash, `|` an edge passing through the row.

use std::fmt::Display;

use crate::core::layout::{Node, NodeKind};
use crate::core::types::{Oid, RefName};
use crate::engine::GraphSnapshot;

/// Length of abbreviated object ids.
pub const SHORT_OID_LEN: usize = 7;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Format reference names for display next to a commit.
///
/// Returns an empty string when there are none.
///
/// # Example
///
/// ```
/// use lanegraph::core::types::RefName;
/// use lanegraph::ui::output::format_refs;
///
/// let refs = vec![
///     RefName::new("refs/heads/main").unwrap(),
///     RefName::new("refs/tags/v1.0").unwrap(),
/// ];
/// assert_eq!(format_refs(&refs), "(main, tag: v1.0)");
/// assert_eq!(format_refs(&[]), "");
/// ```
pub fn format_refs(refs: &[RefName]) -> String {
    if refs.is_empty() {
        return String::new();
    }
    let names: Vec<String> = refs
        .iter()
        .map(|r| {
            if r.is_tag() {
                format!("tag: {}", r.short_name())
            } else {
                r.short_name().to_string()
            }
        })
        .collect();
    format!("({})", names.join(", "))
}

/// Draw the lane cells of one row.
///
/// The result is always `snapshot.width()` characters wide.
pub fn format_lanes(snapshot: &GraphSnapshot, node: &Node) -> String {
    let mut cells = vec![' '; snapshot.width().max(node.lane + 1)];

    for edge in snapshot.edges_in_row_range(node.row, node.row) {
        if edge.from.row < node.row && node.row < edge.to.row {
            if let Some(cell) = cells.get_mut(edge.lane()) {
                *cell = '|';
            }
        }
    }
    cells[node.lane] = match node.kind {
        NodeKind::Commit => '*',
        NodeKind::Stash => '=',
    };

    cells.into_iter().collect()
}

/// Format one commit row: lanes, short id, references, summary.
pub fn format_row(snapshot: &GraphSnapshot, node: &Node, oid: &Oid) -> String {
    let summary = snapshot
        .commit(oid)
        .map(|c| c.summary.as_str())
        .unwrap_or("");
    let refs = match snapshot.stash_at(oid) {
        Some(stash) => format!("(stash@{{{}}})", stash.index),
        None => format_refs(snapshot.references_at(oid)),
    };

    let mut line = format!("{} {}", format_lanes(snapshot, node), oid.short(SHORT_OID_LEN));
    for part in [refs.as_str(), summary] {
        if !part.is_empty() {
            line.push(' ');
            line.push_str(part);
        }
    }
    line
}
