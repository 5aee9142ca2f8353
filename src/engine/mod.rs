//! engine
//!
//! Drives the graph model through update cycles.
//!
//! # Architecture
//!
//! The engine owns the only mutable copy of the commit graph. Each update
//! cycle reads the backend, patches the graph incrementally, then recomputes
//! the layout:
//!
//! ```text
//! ResolvingHead -> DiffingRefs -> DiffingStashes -> Walking -> Linking
//!   -> Pruning -> HidingStashParents -> Sorting -> LayingOut
//! ```
//!
//! # Invariants
//!
//! - A failed cycle publishes nothing; readers keep the last good snapshot
//! - `children` is the exact inverse of `parents` after every cycle
//! - Every commit is reachable from a reference or stash tip
//! - At most one cycle runs at a time (see [`GraphService`])
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lanegraph::backend::GitBackend;
//! use lanegraph::engine::{GraphOptions, GraphService};
//!
//! let backend = Arc::new(GitBackend::open(Path::new("."))?);
//! let service = GraphService::new(backend, GraphOptions::default());
//! service.request_update().await?;
//!
//! let snapshot = service.snapshot();
//! for oid in snapshot.ordered_commits() {
//!     let node = snapshot.position_of(oid);
//! }
//! ```

pub mod model;
pub mod service;
pub mod update;

pub use model::{GraphModel, GraphOptions, GraphSnapshot};
pub use service::{GraphService, ModelChanged};
pub use update::{UpdateCycle, UpdateError, UpdatePhase, UpdateSummary};
