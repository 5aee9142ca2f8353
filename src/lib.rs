//! lanegraph - Incremental commit graph model and lane layout
//!
//! lanegraph keeps an in-memory model of a repository's commit history and
//! assigns every commit a (row, lane) coordinate for drawing it as a graph.
//! The model is updated incrementally as references and stashes move, and
//! the layout is recomputed after each successful update.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, prints snapshots)
//! - [`engine`] - Update cycles, the owned graph model, serialized access
//! - [`core`] - Domain types, commit DAG, lane layout, interval index, config
//! - [`backend`] - Abstraction over the version-control collaborator
//! - [`git`] - Single interface for all Git reads
//! - [`ui`] - Output formatting
//!
//! # Correctness Invariants
//!
//! lanegraph maintains the following invariants:
//!
//! 1. `children` is always the exact inverse of `parents`
//! 2. Every commit in the model is reachable from a reference or stash tip
//! 3. A parent is always drawn on a lower row than each of its children
//! 4. A failed update never replaces the last good snapshot
//! 5. The repository is only ever read, never written

pub mod backend;
pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod ui;
