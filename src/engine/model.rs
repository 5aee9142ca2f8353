//! engine::model
//!
//! The repository graph model: one owned aggregate holding the commit DAG,
//! the reference and stash snapshots, HEAD, and the current layout.
//!
//! # Lifecycle
//!
//! ```text
//! GraphModel::new(options) -> update() -> update() -> ...
//! ```
//!
//! Each [`GraphModel::update`] runs a full cycle on a copy of the current
//! [`GraphSnapshot`] and publishes the copy only if the cycle succeeds.
//! Readers hold an `Arc<GraphSnapshot>`; a published snapshot never changes,
//! it is replaced wholesale by the next successful cycle.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::warn;

use super::update::{UpdateCycle, UpdateError, UpdateSummary};
use crate::backend::{Backend, HeadState, StashEntry};
use crate::core::config::{Config, DEFAULT_EXCLUDE};
use crate::core::graph::{Commit, CommitGraph};
use crate::core::layout::{Edge, LaneLayout, Node};
use crate::core::types::{Oid, RefName};

/// Which references and stashes feed the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphOptions {
    /// Include remote-tracking branches
    pub remotes: bool,
    /// Include tags
    pub tags: bool,
    /// Include stash entries
    pub stashes: bool,
    /// Ref-name prefixes to leave out
    pub exclude: Vec<String>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            remotes: true,
            tags: true,
            stashes: true,
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl GraphOptions {
    /// Resolve options from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            remotes: config.remotes(),
            tags: config.tags(),
            stashes: config.stashes(),
            exclude: config.exclude(),
        }
    }

    /// Check if a reference should feed the graph.
    ///
    /// # Example
    ///
    /// ```
    /// use lanegraph::core::types::RefName;
    /// use lanegraph::engine::GraphOptions;
    ///
    /// let options = GraphOptions::default();
    /// assert!(options.includes(&RefName::new("refs/heads/main").unwrap()));
    /// assert!(!options.includes(&RefName::new("refs/notes/commits").unwrap()));
    /// ```
    pub fn includes(&self, name: &RefName) -> bool {
        if name.is_stash() {
            return false;
        }
        if name.is_remote() && !self.remotes {
            return false;
        }
        if name.is_tag() && !self.tags {
            return false;
        }
        !self
            .exclude
            .iter()
            .any(|prefix| name.as_str().starts_with(prefix.as_str()))
    }
}

/// A point-in-time view of the model.
///
/// Everything a renderer needs: the commit order, positions, edges, and the
/// reference and stash lookups.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    pub(crate) graph: CommitGraph,
    pub(crate) references: BTreeMap<RefName, Oid>,
    pub(crate) stashes: Vec<StashEntry>,
    pub(crate) head: HeadState,
    pub(crate) refs_by_commit: HashMap<Oid, Vec<RefName>>,
    pub(crate) layout: LaneLayout,
}

impl GraphSnapshot {
    /// Commits in display order, newest first.
    pub fn ordered_commits(&self) -> &[Oid] {
        self.graph.order()
    }

    /// Row, lane and kind of a commit, or `None` if it is unknown or pruned.
    pub fn position_of(&self, oid: &Oid) -> Option<&Node> {
        self.layout.position_of(oid)
    }

    /// Edges whose row span overlaps `[first, last]`, ordered by child row.
    pub fn edges_in_row_range(&self, first: usize, last: usize) -> Vec<&Edge> {
        self.layout.edges_in_rows(first, last)
    }

    /// Number of lanes, for sizing the drawing surface.
    pub fn width(&self) -> usize {
        self.layout.width()
    }

    /// Number of commits in the model.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Check if the model holds no commits.
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// The reference snapshot.
    pub fn references(&self) -> &BTreeMap<RefName, Oid> {
        &self.references
    }

    /// Reference names pointing at a commit, sorted.
    pub fn references_at(&self, oid: &Oid) -> &[RefName] {
        self.refs_by_commit
            .get(oid)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The stash snapshot, most recent first.
    pub fn stashes(&self) -> &[StashEntry] {
        &self.stashes
    }

    /// The stash entry wrapping a commit, if any.
    pub fn stash_at(&self, oid: &Oid) -> Option<&StashEntry> {
        self.stashes.iter().find(|s| &s.oid == oid)
    }

    /// Where HEAD pointed during the last cycle.
    pub fn head(&self) -> &HeadState {
        &self.head
    }

    /// Commit data for a known commit.
    pub fn commit(&self, oid: &Oid) -> Option<&Commit> {
        self.graph.commit(oid)
    }

    /// Position of a commit in [`GraphSnapshot::ordered_commits`].
    pub fn index_of(&self, oid: &Oid) -> Option<usize> {
        self.graph.index_of(oid)
    }

    /// The underlying commit graph.
    pub fn graph(&self) -> &CommitGraph {
        &self.graph
    }

    /// The full layout.
    pub fn layout(&self) -> &LaneLayout {
        &self.layout
    }

    /// Check if the edge from `child` to `parent` belongs in the model.
    ///
    /// Stash parents after the mainline only do when a reference points
    /// at them.
    pub(crate) fn keeps_parent(&self, child: &Oid, parent: &Oid) -> bool {
        let mainline = self.graph.commit(child).and_then(|c| c.parents.first());
        mainline == Some(parent)
            || self.stash_at(child).is_none()
            || self.references.values().any(|tip| tip == parent)
    }

    /// Every reference and stash tip.
    pub(crate) fn tips(&self) -> Vec<Oid> {
        self.references
            .values()
            .chain(self.stashes.iter().map(|s| &s.oid))
            .cloned()
            .collect()
    }
}

/// The repository graph model.
///
/// Owns the current snapshot and the options that shape it. Not shared:
/// wrap it in a [`GraphService`](super::GraphService) to serialize updates
/// from several tasks.
#[derive(Debug, Default)]
pub struct GraphModel {
    state: Arc<GraphSnapshot>,
    options: GraphOptions,
    last_error: Option<UpdateError>,
}

impl GraphModel {
    /// Create an empty model.
    pub fn new(options: GraphOptions) -> Self {
        Self {
            state: Arc::new(GraphSnapshot::default()),
            options,
            last_error: None,
        }
    }

    /// The options this model was built with.
    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        Arc::clone(&self.state)
    }

    /// The error from the most recent cycle, if it failed.
    ///
    /// Cleared by the next successful cycle.
    pub fn last_error(&self) -> Option<&UpdateError> {
        self.last_error.as_ref()
    }

    /// Run one update cycle against `backend`.
    ///
    /// On success the new snapshot replaces the old one. On failure the old
    /// snapshot stays in place, untouched.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::DateTime;
    /// use lanegraph::backend::mock::MockBackend;
    /// use lanegraph::core::graph::Commit;
    /// use lanegraph::core::types::{Oid, RefName};
    /// use lanegraph::engine::{GraphModel, GraphOptions};
    ///
    /// # tokio_test::block_on(async {
    /// let root = Oid::new("a".repeat(40)).unwrap();
    /// let backend = MockBackend::new();
    /// backend.add_commit(Commit {
    ///     oid: root.clone(),
    ///     parents: vec![],
    ///     author_time: DateTime::from_timestamp(1, 0).unwrap(),
    ///     summary: "root".into(),
    /// });
    /// backend.set_ref(RefName::new("refs/heads/main").unwrap(), root.clone());
    ///
    /// let mut model = GraphModel::new(GraphOptions::default());
    /// model.update(&backend).await.unwrap();
    /// assert_eq!(model.snapshot().ordered_commits(), &[root]);
    /// # });
    /// ```
    pub async fn update(&mut self, backend: &dyn Backend) -> Result<UpdateSummary, UpdateError> {
        let mut cycle = UpdateCycle::new((*self.state).clone(), &self.options);
        match cycle.run(backend).await {
            Ok(summary) => {
                self.state = Arc::new(cycle.into_snapshot());
                self.last_error = None;
                Ok(summary)
            }
            Err(err) => {
                warn!(phase = %err.phase(), error = %err, "update cycle failed, keeping previous graph");
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}
