//! core
//!
//! Core domain types and algorithms for lanegraph.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, RefName
//! - [`graph`] - Commit DAG adjacency, pruning and total-order sort
//! - [`interval`] - Interval tree over row spans
//! - [`layout`] - Lane assignment and the edge index
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Everything here is synchronous and deterministic
//! - Deep histories never recurse: traversals use explicit stacks

pub mod config;
pub mod graph;
pub mod interval;
pub mod layout;
pub mod types;
