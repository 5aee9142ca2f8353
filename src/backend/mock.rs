//! backend::mock
//!
//! Mock backend implementation for deterministic testing.
//!
//! # Design
//!
//! The mock backend holds an in-memory object store, reference table, stash
//! stack and HEAD. Tests mutate it between update cycles to simulate
//! branches moving, rebases, stash pushes and drops. Individual operations
//! can be configured to fail, and an artificial latency makes interleaving
//! observable.
//!
//! The ancestry walk follows git's hide semantics: everything reachable from
//! a hidden id is excluded, not just the id itself. Parents that were never
//! added are silently skipped, which is how tests simulate a backend that
//! hands out an inconsistent snapshot.
//!
//! # Example
//!
//! ```
//! use chrono::DateTime;
//! use lanegraph::backend::mock::MockBackend;
//! use lanegraph::backend::Backend;
//! use lanegraph::core::graph::Commit;
//! use lanegraph::core::types::{Oid, RefName};
//!
//! # tokio_test::block_on(async {
//! let root = Oid::new("a".repeat(40)).unwrap();
//! let backend = MockBackend::new();
//! backend.add_commit(Commit {
//!     oid: root.clone(),
//!     parents: vec![],
//!     author_time: DateTime::from_timestamp(1, 0).unwrap(),
//!     summary: "root".into(),
//! });
//! backend.set_ref(RefName::new("refs/heads/main").unwrap(), root.clone());
//!
//! let refs = backend.list_references().await.unwrap();
//! assert_eq!(refs.len(), 1);
//! assert_eq!(backend.walk_ancestry(&[root.clone()], &[]).await.unwrap(), vec![root]);
//! # });
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{Backend, BackendError};
use crate::core::graph::Commit;
use crate::core::types::{Oid, RefName};
use crate::git::{HeadState, RefEntry, StashEntry};

/// Mock backend for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockBackendInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockBackendInner {
    /// Object store.
    commits: HashMap<Oid, Commit>,
    /// Reference table.
    refs: BTreeMap<RefName, Oid>,
    /// Stash stack, most recent first.
    stashes: Vec<Oid>,
    /// Current HEAD.
    head: HeadState,
    /// Operation to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Delay applied before every operation.
    latency: Option<Duration>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail list_references with the given error.
    ListReferences(BackendError),
    /// Fail list_stashes with the given error.
    ListStashes(BackendError),
    /// Fail resolve_head with the given error.
    ResolveHead(BackendError),
    /// Fail fetch_commit (and fetch_commits) with the given error.
    FetchCommit(BackendError),
    /// Fail walk_ancestry with the given error.
    WalkAncestry(BackendError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ListReferences,
    ListStashes,
    ResolveHead,
    FetchCommit { oid: Oid },
    WalkAncestry { start: Vec<Oid>, hide: Vec<Oid> },
}

impl MockBackend {
    /// Create a new empty mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockBackendInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delay every operation by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state().latency = Some(latency);
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use lanegraph::backend::mock::{FailOn, MockBackend};
    /// use lanegraph::backend::BackendError;
    ///
    /// let backend = MockBackend::new()
    ///     .fail_on(FailOn::WalkAncestry(BackendError::Unavailable("offline".into())));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.set_fail_on(fail_on);
        self
    }

    /// Configure a failure on a shared handle.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        self.state().fail_on = Some(fail_on);
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    // =========================================================================
    // Repository mutation
    // =========================================================================

    /// Add a commit to the object store.
    pub fn add_commit(&self, commit: Commit) {
        self.state().commits.insert(commit.oid.clone(), commit);
    }

    /// Remove a commit from the object store.
    ///
    /// Simulates garbage collection after a rebase.
    pub fn remove_commit(&self, oid: &Oid) {
        self.state().commits.remove(oid);
    }

    /// Create or move a reference.
    pub fn set_ref(&self, name: RefName, oid: Oid) {
        self.state().refs.insert(name, oid);
    }

    /// Delete a reference.
    pub fn delete_ref(&self, name: &RefName) {
        self.state().refs.remove(name);
    }

    /// Push a stash commit onto the stack.
    pub fn push_stash(&self, oid: Oid) {
        self.state().stashes.insert(0, oid);
    }

    /// Drop the stash at `index`, if present.
    pub fn drop_stash(&self, index: usize) {
        let mut inner = self.state();
        if index < inner.stashes.len() {
            inner.stashes.remove(index);
        }
    }

    /// Point HEAD somewhere.
    pub fn set_head(&self, head: HeadState) {
        self.state().head = head;
    }

    /// Attach HEAD to `branch`, resolving it from the reference table.
    pub fn checkout(&self, branch: RefName) {
        let mut inner = self.state();
        let oid = inner.refs.get(&branch).cloned();
        inner.head = HeadState {
            branch: Some(branch),
            oid,
        };
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Record an operation, wait out the latency, and report a configured failure.
    async fn enter(&self, op: MockOperation) -> Result<(), BackendError> {
        let (latency, failure) = {
            let mut inner = self.state();
            let failure = match (&inner.fail_on, &op) {
                (Some(FailOn::ListReferences(e)), MockOperation::ListReferences)
                | (Some(FailOn::ListStashes(e)), MockOperation::ListStashes)
                | (Some(FailOn::ResolveHead(e)), MockOperation::ResolveHead)
                | (Some(FailOn::FetchCommit(e)), MockOperation::FetchCommit { .. })
                | (Some(FailOn::WalkAncestry(e)), MockOperation::WalkAncestry { .. }) => {
                    Some(e.clone())
                }
                _ => None,
            };
            inner.operations.push(op);
            (inner.latency, failure)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Everything reachable from `from` through parents that exist in the store.
    fn closure(inner: &MockBackendInner, from: &[Oid], skip: &HashSet<Oid>) -> Vec<Oid> {
        let mut seen: HashSet<Oid> = HashSet::new();
        let mut visited = Vec::new();
        let mut stack: Vec<&Oid> = from.iter().rev().collect();

        while let Some(oid) = stack.pop() {
            if skip.contains(oid) || !seen.insert(oid.clone()) {
                continue;
            }
            let Some(commit) = inner.commits.get(oid) else {
                continue;
            };
            visited.push(oid.clone());
            stack.extend(commit.parents.iter().rev());
        }

        visited
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_references(&self) -> Result<Vec<RefEntry>, BackendError> {
        self.enter(MockOperation::ListReferences).await?;

        let inner = self.state();
        let mut entries: Vec<RefEntry> = inner
            .refs
            .iter()
            .filter(|(name, _)| !name.is_stash())
            .map(|(name, oid)| RefEntry {
                name: name.clone(),
                oid: oid.clone(),
            })
            .collect();

        if let (true, Some(oid)) = (inner.head.is_detached(), inner.head.oid.clone()) {
            let name = RefName::new(RefName::HEAD)
                .map_err(|e| BackendError::Unavailable(e.to_string()))?;
            entries.push(RefEntry { name, oid });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn list_stashes(&self) -> Result<Vec<StashEntry>, BackendError> {
        self.enter(MockOperation::ListStashes).await?;

        Ok(self
            .state()
            .stashes
            .iter()
            .enumerate()
            .map(|(index, oid)| StashEntry {
                index,
                oid: oid.clone(),
            })
            .collect())
    }

    async fn resolve_head(&self) -> Result<HeadState, BackendError> {
        self.enter(MockOperation::ResolveHead).await?;
        Ok(self.state().head.clone())
    }

    async fn fetch_commit(&self, oid: &Oid) -> Result<Commit, BackendError> {
        self.enter(MockOperation::FetchCommit { oid: oid.clone() })
            .await?;

        self.state()
            .commits
            .get(oid)
            .cloned()
            .ok_or_else(|| BackendError::ObjectNotFound(oid.to_string()))
    }

    async fn walk_ancestry(&self, start: &[Oid], hide: &[Oid]) -> Result<Vec<Oid>, BackendError> {
        self.enter(MockOperation::WalkAncestry {
            start: start.to_vec(),
            hide: hide.to_vec(),
        })
        .await?;

        let inner = self.state();
        if let Some(missing) = start.iter().find(|oid| !inner.commits.contains_key(*oid)) {
            return Err(BackendError::ObjectNotFound(missing.to_string()));
        }

        let hidden: HashSet<Oid> = Self::closure(&inner, hide, &HashSet::new())
            .into_iter()
            .collect();
        Ok(Self::closure(&inner, start, &hidden))
    }
}
