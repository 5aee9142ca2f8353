//! backend::git
//!
//! Backend over a real git repository.
//!
//! git2 calls block, so each one runs on tokio's blocking pool. The
//! repository handle is shared behind a mutex because `git2::Repository`
//! is `Send` but not `Sync`.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::traits::{Backend, BackendError};
use crate::core::graph::Commit;
use crate::core::types::Oid;
use crate::git::{Git, GitError, HeadState, RefEntry, StashEntry};

/// Backend reading from a git repository through [`Git`].
#[derive(Debug, Clone)]
pub struct GitBackend {
    git: Arc<Mutex<Git>>,
}

impl GitBackend {
    /// Open the repository containing `path`.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        Ok(Self::new(Git::open(path)?))
    }

    /// Wrap an already opened repository.
    pub fn new(git: Git) -> Self {
        Self {
            git: Arc::new(Mutex::new(git)),
        }
    }

    /// Run `f` against the repository on the blocking pool.
    async fn with_git<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&Git) -> Result<T, GitError> + Send + 'static,
    {
        let git = Arc::clone(&self.git);
        tokio::task::spawn_blocking(move || {
            let git = git.lock().unwrap_or_else(PoisonError::into_inner);
            f(&git).map_err(BackendError::from)
        })
        .await
        .map_err(|e| BackendError::Unavailable(format!("git task failed: {e}")))?
    }
}

#[async_trait]
impl Backend for GitBackend {
    fn name(&self) -> &'static str {
        "git"
    }

    async fn list_references(&self) -> Result<Vec<RefEntry>, BackendError> {
        self.with_git(|git| git.list_references()).await
    }

    async fn list_stashes(&self) -> Result<Vec<StashEntry>, BackendError> {
        self.with_git(|git| git.list_stashes()).await
    }

    async fn resolve_head(&self) -> Result<HeadState, BackendError> {
        self.with_git(|git| git.head()).await
    }

    async fn fetch_commit(&self, oid: &Oid) -> Result<Commit, BackendError> {
        let oid = oid.clone();
        self.with_git(move |git| git.commit(&oid)).await
    }

    async fn fetch_commits(&self, oids: &[Oid]) -> Result<Vec<Commit>, BackendError> {
        let oids = oids.to_vec();
        self.with_git(move |git| oids.iter().map(|oid| git.commit(oid)).collect())
            .await
    }

    async fn walk_ancestry(&self, start: &[Oid], hide: &[Oid]) -> Result<Vec<Oid>, BackendError> {
        let (start, hide) = (start.to_vec(), hide.to_vec());
        self.with_git(move |git| git.walk(&start, &hide)).await
    }
}
