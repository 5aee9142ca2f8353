//! backend
//!
//! Abstraction over the version-control collaborator the graph reads from.
//!
//! # Architecture
//!
//! The `Backend` trait is the only thing the update cycle knows about a
//! repository. It supplies reference tips, stash entries, HEAD, commit
//! metadata and an ancestry walk; it never mutates anything.
//!
//! # Modules
//!
//! - `traits`: Core `Backend` trait and `BackendError`
//! - [`git`]: Implementation over a real repository (git2)
//! - [`mock`]: In-memory implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use lanegraph::backend::{Backend, GitBackend};
//! use std::path::Path;
//!
//! let backend = GitBackend::open(Path::new("."))?;
//! let head = backend.resolve_head().await?;
//! ```

pub mod git;
pub mod mock;
mod traits;

pub use self::git::GitBackend;
pub use crate::git::{HeadState, RefEntry, StashEntry};
pub use traits::*;
