//! git
//!
//! Single interface for all Git reads.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. Reference snapshots, stash
//! lists, commit reads and ancestry walks all flow through this interface.
//! No other module should import `git2`.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Reference listing (peeled to commits)
//! - Stash listing
//! - HEAD resolution
//! - Commit reads and ancestry walks
//!
//! # Invariants
//!
//! - The repository is never written to
//! - No other module calls git2 directly
//! - All operations return strong types (Oid, RefName)
//!
//! # Example
//!
//! ```ignore
//! use lanegraph::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let tips: Vec<_> = git.list_references()?.into_iter().map(|r| r.oid).collect();
//! let new_commits = git.walk(&tips, &[])?;
//! ```

mod interface;

pub use interface::{Git, GitError, HeadState, RefEntry, StashEntry};
