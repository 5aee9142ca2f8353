//! backend::traits
//!
//! Backend trait definition for reading a repository's commit history.
//!
//! # Design
//!
//! The `Backend` trait is async because every call may block on the object
//! store (disk for git, a channel or network hop for anything else). The
//! update cycle awaits nothing except these calls, so they are its only
//! suspension points.
//!
//! Backends only ever observe a repository. They:
//! - Report references already peeled to commits
//! - Exclude the stash pseudo-reference from the reference list
//! - Hide everything reachable from `hide` when walking ancestry
//!
//! # Example
//!
//! ```ignore
//! use lanegraph::backend::{Backend, BackendError};
//!
//! async fn tips(backend: &dyn Backend) -> Result<usize, BackendError> {
//!     let refs = backend.list_references().await?;
//!     let starts: Vec<_> = refs.into_iter().map(|r| r.oid).collect();
//!     Ok(backend.walk_ancestry(&starts, &[]).await?.len())
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::graph::Commit;
use crate::core::types::Oid;
use crate::git::{GitError, HeadState, RefEntry, StashEntry};

/// Errors from backend operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend could not be reached or the call failed.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// An id did not resolve to a commit.
    #[error("object not found: {0}")]
    ObjectNotFound(String),
}

impl From<GitError> for BackendError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::ObjectNotFound { oid } => BackendError::ObjectNotFound(oid),
            GitError::InvalidOid { oid } => BackendError::ObjectNotFound(oid),
            other => BackendError::Unavailable(other.to_string()),
        }
    }
}

/// The version-control collaborator the graph model reads from.
///
/// Implementations must be thread-safe (`Send + Sync`) so a model can be
/// driven from any task.
///
/// # Example
///
/// ```ignore
/// async fn resolve(backend: &dyn Backend, oid: &Oid) -> Result<(), BackendError> {
///     let commit = backend.fetch_commit(oid).await?;
///     println!("{} {}", commit.oid.short(7), commit.summary);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the backend name (e.g., "git", "mock").
    fn name(&self) -> &'static str;

    /// List every reference with the commit it names.
    ///
    /// The stash pseudo-reference is never included.
    async fn list_references(&self) -> Result<Vec<RefEntry>, BackendError>;

    /// List stash entries, most recent first.
    async fn list_stashes(&self) -> Result<Vec<StashEntry>, BackendError>;

    /// Resolve HEAD.
    async fn resolve_head(&self) -> Result<HeadState, BackendError>;

    /// Fetch a single commit.
    ///
    /// # Errors
    ///
    /// - [`BackendError::ObjectNotFound`] if the id does not resolve
    async fn fetch_commit(&self, oid: &Oid) -> Result<Commit, BackendError>;

    /// Fetch several commits.
    ///
    /// The default implementation fetches them one at a time.
    async fn fetch_commits(&self, oids: &[Oid]) -> Result<Vec<Commit>, BackendError> {
        let mut commits = Vec::with_capacity(oids.len());
        for oid in oids {
            commits.push(self.fetch_commit(oid).await?);
        }
        Ok(commits)
    }

    /// Enumerate commits reachable from `start`, skipping everything
    /// reachable from `hide`.
    ///
    /// # Errors
    ///
    /// - [`BackendError::ObjectNotFound`] if a start id does not resolve
    async fn walk_ancestry(&self, start: &[Oid], hide: &[Oid]) -> Result<Vec<Oid>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn git_not_found_maps_to_object_not_found() {
        let err: BackendError = GitError::ObjectNotFound {
            oid: "abc".into(),
        }
        .into();
        assert_eq!(err, BackendError::ObjectNotFound("abc".into()));
    }

    #[test]
    fn other_git_errors_map_to_unavailable() {
        let err: BackendError = GitError::NotARepo {
            path: PathBuf::from("/nowhere"),
        }
        .into();
        assert!(matches!(err, BackendError::Unavailable(msg) if msg.contains("/nowhere")));
    }

    #[test]
    fn backend_error_display() {
        assert_eq!(
            BackendError::Unavailable("timeout".into()).to_string(),
            "backend unavailable: timeout"
        );
        assert_eq!(
            BackendError::ObjectNotFound("abc".into()).to_string(),
            "object not found: abc"
        );
    }
}
