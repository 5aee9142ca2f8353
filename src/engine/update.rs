//! engine::update
//!
//! The incremental update cycle.
//!
//! # Stages
//!
//! ```text
//! Idle -> ResolvingHead -> DiffingRefs -> DiffingStashes -> Walking
//!      -> Linking -> Pruning -> HidingStashParents -> Sorting -> LayingOut -> Idle
//! ```
//!
//! Only backend calls suspend (HEAD, references, stashes, the ancestry walk
//! and commit fetches). Everything from `Linking` on is synchronous CPU work.
//!
//! # Atomicity
//!
//! A cycle works on its own copy of the snapshot. The caller swaps the copy
//! in only after every stage has succeeded, so a failure at any stage leaves
//! the published snapshot exactly as it was.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use super::model::{GraphOptions, GraphSnapshot};
use crate::backend::{Backend, BackendError, StashEntry};
use crate::core::graph::{Commit, GraphError};
use crate::core::layout::LaneLayout;
use crate::core::types::{Oid, RefName};

/// Stage of the update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdatePhase {
    /// No cycle running
    Idle,
    ResolvingHead,
    DiffingRefs,
    DiffingStashes,
    Walking,
    Linking,
    Pruning,
    HidingStashParents,
    Sorting,
    LayingOut,
}

impl std::fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UpdatePhase::Idle => "idle",
            UpdatePhase::ResolvingHead => "resolving HEAD",
            UpdatePhase::DiffingRefs => "diffing references",
            UpdatePhase::DiffingStashes => "diffing stashes",
            UpdatePhase::Walking => "walking ancestry",
            UpdatePhase::Linking => "linking parents",
            UpdatePhase::Pruning => "pruning unreachable commits",
            UpdatePhase::HidingStashParents => "hiding stash parents",
            UpdatePhase::Sorting => "sorting commits",
            UpdatePhase::LayingOut => "computing layout",
        };
        write!(f, "{}", name)
    }
}

/// Errors that abort an update cycle.
///
/// The model is left at its last good snapshot whenever one of these is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// A backend call failed.
    #[error("{phase}: {source}")]
    Backend {
        /// Stage that made the call
        phase: UpdatePhase,
        /// What the backend reported
        #[source]
        source: BackendError,
    },

    /// The backend handed out data the graph cannot hold together.
    #[error("{phase}: inconsistent snapshot: {message}")]
    InconsistentSnapshot {
        /// Stage that detected the problem
        phase: UpdatePhase,
        /// Description of the desync
        message: String,
    },
}

impl UpdateError {
    /// Stage the cycle was in when it failed.
    pub fn phase(&self) -> UpdatePhase {
        match self {
            UpdateError::Backend { phase, .. } | UpdateError::InconsistentSnapshot { phase, .. } => {
                *phase
            }
        }
    }

    fn inconsistent(phase: UpdatePhase, err: GraphError) -> Self {
        UpdateError::InconsistentSnapshot {
            phase,
            message: err.to_string(),
        }
    }
}

/// What a successful cycle changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// References that are new or moved
    pub changed_refs: Vec<RefName>,
    /// Stash entries not seen before
    pub new_stashes: Vec<StashEntry>,
    /// Commits fetched and linked
    pub new_commits: usize,
    /// Commits removed as unreachable
    pub pruned: usize,
    /// Commits pruned once stashes were cut off their synthetic parents
    pub hidden: usize,
    /// Commits in the model afterwards
    pub total: usize,
    /// Lane count of the new layout
    pub width: usize,
}

/// One run of the update pipeline over a private copy of the snapshot.
///
/// Stages can be driven one at a time; [`UpdateCycle::run`] drives them
/// all in order.
#[derive(Debug)]
pub struct UpdateCycle<'a> {
    state: GraphSnapshot,
    options: &'a GraphOptions,
    phase: UpdatePhase,
}

impl<'a> UpdateCycle<'a> {
    /// Start a cycle from `state`.
    pub fn new(state: GraphSnapshot, options: &'a GraphOptions) -> Self {
        Self {
            state,
            options,
            phase: UpdatePhase::Idle,
        }
    }

    /// The stage currently running (or last run).
    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    /// The working copy.
    pub fn state(&self) -> &GraphSnapshot {
        &self.state
    }

    /// Finish the cycle and hand back the working copy.
    pub fn into_snapshot(self) -> GraphSnapshot {
        self.state
    }

    fn enter(&mut self, phase: UpdatePhase) {
        debug!(%phase, "update stage");
        self.phase = phase;
    }

    fn backend_error(&self, source: BackendError) -> UpdateError {
        UpdateError::Backend {
            phase: self.phase,
            source,
        }
    }

    /// Run every stage in order.
    pub async fn run(&mut self, backend: &dyn Backend) -> Result<UpdateSummary, UpdateError> {
        let started = Instant::now();

        self.resolve_head(backend).await?;
        let changed_refs = self.update_references(backend).await?;
        let new_stashes = self.update_stashes(backend).await?;
        let new_commits = self
            .integrate_new_commits(backend, &changed_refs, &new_stashes)
            .await?;
        let new_count = new_commits.len();
        self.link_parents(new_commits)?;
        let pruned = self.prune_unreachable();
        let hidden = self.hide_stash_second_parents();
        self.sort_commits()?;
        self.compute_layout();
        self.phase = UpdatePhase::Idle;

        let summary = UpdateSummary {
            changed_refs,
            new_stashes,
            new_commits: new_count,
            pruned: pruned.len(),
            hidden: hidden.len(),
            total: self.state.len(),
            width: self.state.width(),
        };
        info!(
            backend = backend.name(),
            changed_refs = summary.changed_refs.len(),
            new_stashes = summary.new_stashes.len(),
            new_commits = summary.new_commits,
            pruned = summary.pruned,
            hidden = summary.hidden,
            total = summary.total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "update cycle complete"
        );
        Ok(summary)
    }

    /// Resolve HEAD and remember it.
    pub async fn resolve_head(&mut self, backend: &dyn Backend) -> Result<(), UpdateError> {
        self.enter(UpdatePhase::ResolvingHead);
        let head = backend
            .resolve_head()
            .await
            .map_err(|e| self.backend_error(e))?;
        self.state.head = head;
        Ok(())
    }

    /// Replace the reference snapshot.
    ///
    /// Returns the names that are new or whose target moved, sorted.
    pub async fn update_references(
        &mut self,
        backend: &dyn Backend,
    ) -> Result<Vec<RefName>, UpdateError> {
        self.enter(UpdatePhase::DiffingRefs);
        let entries = backend
            .list_references()
            .await
            .map_err(|e| self.backend_error(e))?;

        let current: BTreeMap<RefName, Oid> = entries
            .into_iter()
            .filter(|entry| !entry.name.is_stash() && self.options.includes(&entry.name))
            .map(|entry| (entry.name, entry.oid))
            .collect();

        let changed: Vec<RefName> = current
            .iter()
            .filter(|(name, oid)| self.state.references.get(*name) != Some(*oid))
            .map(|(name, _)| name.clone())
            .collect();

        debug!(
            total = current.len(),
            changed = changed.len(),
            removed = self
                .state
                .references
                .keys()
                .filter(|name| !current.contains_key(*name))
                .count(),
            "references diffed"
        );
        self.state.references = current;
        Ok(changed)
    }

    /// Replace the stash snapshot.
    ///
    /// Returns the entries whose commit was not in the previous snapshot.
    /// With stashes disabled the snapshot is always empty.
    pub async fn update_stashes(
        &mut self,
        backend: &dyn Backend,
    ) -> Result<Vec<StashEntry>, UpdateError> {
        self.enter(UpdatePhase::DiffingStashes);
        let current = if self.options.stashes {
            backend
                .list_stashes()
                .await
                .map_err(|e| self.backend_error(e))?
        } else {
            Vec::new()
        };

        let known: HashSet<&Oid> = self.state.stashes.iter().map(|s| &s.oid).collect();
        let fresh: Vec<StashEntry> = current
            .iter()
            .filter(|s| !known.contains(&s.oid))
            .cloned()
            .collect();

        debug!(total = current.len(), new = fresh.len(), "stashes diffed");
        self.state.stashes = current;
        Ok(fresh)
    }

    /// Fetch every commit reachable from the changed tips that the model
    /// does not hold yet.
    ///
    /// One ancestry walk is issued, seeded at the changed reference tips,
    /// the new stash commits and any absent parent whose edge belongs in
    /// the model again (a stash parent that gained a reference, or the
    /// parents of a dropped stash). Known commits are hidden, except those
    /// whose recorded ancestry reaches past the model.
    pub async fn integrate_new_commits(
        &mut self,
        backend: &dyn Backend,
        changed_refs: &[RefName],
        new_stashes: &[StashEntry],
    ) -> Result<Vec<Commit>, UpdateError> {
        self.enter(UpdatePhase::Walking);

        let graph = &self.state.graph;
        let absent: Vec<(&Oid, &Oid)> = graph
            .oids()
            .filter_map(|oid| graph.commit(oid))
            .flat_map(|c| c.parents.iter().map(move |p| (&c.oid, p)))
            .filter(|(child, parent)| {
                !graph.contains(parent) && self.state.keeps_parent(child, parent)
            })
            .collect();
        // Only commits the tips still reach get their parents back
        let live = if absent.is_empty() {
            HashSet::new()
        } else {
            graph.reachable(&self.state.tips())
        };
        let mut restorable: Vec<&Oid> = absent
            .into_iter()
            .filter(|(child, _)| live.contains(*child))
            .map(|(_, parent)| parent)
            .collect();
        restorable.sort();

        let mut seen = HashSet::new();
        let start: Vec<Oid> = changed_refs
            .iter()
            .filter_map(|name| self.state.references.get(name))
            .chain(new_stashes.iter().map(|s| &s.oid))
            .chain(restorable)
            .filter(|oid| !graph.contains(oid))
            .filter(|oid| seen.insert(*oid))
            .cloned()
            .collect();
        if start.is_empty() {
            debug!("no new tips to walk");
            return Ok(Vec::new());
        }

        let trimmed = graph.trimmed();
        let hide: Vec<Oid> = graph
            .oids()
            .filter(|oid| !trimmed.contains(*oid))
            .cloned()
            .collect();
        let mut walked = backend
            .walk_ancestry(&start, &hide)
            .await
            .map_err(|e| self.backend_error(e))?;
        walked.retain(|oid| !self.state.graph.contains(oid));
        let commits = backend
            .fetch_commits(&walked)
            .await
            .map_err(|e| self.backend_error(e))?;

        debug!(
            tips = start.len(),
            hidden = hide.len(),
            fetched = commits.len(),
            "ancestry walked"
        );
        Ok(commits)
    }

    /// Link freshly fetched commits into the adjacency maps.
    ///
    /// Known commits whose recorded parents are back in the graph are
    /// relinked to them too.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::InconsistentSnapshot`] if a commit names a parent
    ///   that is neither known nor part of the batch
    pub fn link_parents(&mut self, commits: Vec<Commit>) -> Result<(), UpdateError> {
        self.enter(UpdatePhase::Linking);
        let count = commits.len();
        self.state
            .graph
            .link(commits)
            .map_err(|e| UpdateError::inconsistent(UpdatePhase::Linking, e))?;
        let restored = self.state.graph.restore_parents();
        debug!(
            linked = count,
            restored = restored.len(),
            total = self.state.graph.len(),
            "parents linked"
        );
        Ok(())
    }

    /// Drop every commit no reference or stash can reach.
    pub fn prune_unreachable(&mut self) -> Vec<Oid> {
        self.enter(UpdatePhase::Pruning);
        let tips = self.state.tips();
        let removed = self.state.graph.prune_unreachable(&tips);
        if !removed.is_empty() {
            debug!(pruned = removed.len(), "unreachable commits pruned");
        }
        removed
    }

    /// Cut every stash off its synthetic parents.
    ///
    /// Every parent after the first holds index or untracked content, so the
    /// edge to it is dropped, and whatever is then unreachable is pruned.
    /// The edge stays when the parent is itself a reference tip. All current
    /// stashes are checked, so edges restored while linking are cut again.
    ///
    /// Returns the pruned commits.
    pub fn hide_stash_second_parents(&mut self) -> Vec<Oid> {
        self.enter(UpdatePhase::HidingStashParents);

        let ref_tips: HashSet<&Oid> = self.state.references.values().collect();
        let mut cut = 0;
        for stash in &self.state.stashes {
            let mainline = match self.state.graph.commit(&stash.oid) {
                Some(commit) => commit.parents.first().cloned(),
                None => continue,
            };
            let dropped = self.state.graph.retain_parents(&stash.oid, |p| {
                Some(p) == mainline.as_ref() || ref_tips.contains(p)
            });
            cut += dropped.len();
        }
        if cut == 0 {
            return Vec::new();
        }

        let tips = self.state.tips();
        let hidden = self.state.graph.prune_unreachable(&tips);
        debug!(edges = cut, hidden = hidden.len(), "stash parents hidden");
        hidden
    }

    /// Compute the total order and check the adjacency invariants.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::InconsistentSnapshot`] if the maps disagree
    pub fn sort_commits(&mut self) -> Result<(), UpdateError> {
        self.enter(UpdatePhase::Sorting);
        self.state.graph.sort();
        self.state
            .graph
            .verify()
            .map_err(|e| UpdateError::inconsistent(UpdatePhase::Sorting, e))
    }

    /// Recompute lanes, edges and the reference lookup.
    pub fn compute_layout(&mut self) {
        self.enter(UpdatePhase::LayingOut);
        let started = Instant::now();

        let stash_oids: HashSet<&Oid> = self.state.stashes.iter().map(|s| &s.oid).collect();
        let layout = LaneLayout::compute(
            &self.state.graph,
            self.state.head.oid.as_ref(),
            |oid| stash_oids.contains(oid),
        );

        let mut refs_by_commit: HashMap<Oid, Vec<RefName>> = HashMap::new();
        for (name, oid) in &self.state.references {
            refs_by_commit
                .entry(oid.clone())
                .or_default()
                .push(name.clone());
        }

        debug!(
            rows = self.state.graph.len(),
            width = layout.width(),
            edges = layout.edges().len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "layout computed"
        );
        self.state.layout = layout;
        self.state.refs_by_commit = refs_by_commit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{FailOn, MockBackend, MockOperation};
    use crate::git::HeadState;
    use chrono::DateTime;

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    fn name(s: &str) -> RefName {
        RefName::new(s).unwrap()
    }

    fn commit(c: char, parents: &[char], t: i64) -> Commit {
        Commit {
            oid: oid(c),
            parents: parents.iter().map(|p| oid(*p)).collect(),
            author_time: DateTime::from_timestamp(t, 0).unwrap(),
            summary: format!("commit {c}"),
        }
    }

    fn backend() -> MockBackend {
        let backend = MockBackend::new();
        backend.add_commit(commit('a', &[], 1));
        backend.add_commit(commit('b', &['a'], 2));
        backend.add_commit(commit('c', &['b'], 3));
        backend.set_ref(name("refs/heads/main"), oid('c'));
        backend
    }

    #[test]
    fn phase_display() {
        assert_eq!(UpdatePhase::Walking.to_string(), "walking ancestry");
        assert_eq!(UpdatePhase::HidingStashParents.to_string(), "hiding stash parents");
    }

    #[test]
    fn error_reports_phase() {
        let err = UpdateError::Backend {
            phase: UpdatePhase::Walking,
            source: BackendError::Unavailable("down".into()),
        };
        assert_eq!(err.phase(), UpdatePhase::Walking);
        assert_eq!(err.to_string(), "walking ancestry: backend unavailable: down");
    }

    #[tokio::test]
    async fn unchanged_references_are_not_reported() {
        let backend = backend();
        let options = GraphOptions::default();
        let mut cycle = UpdateCycle::new(GraphSnapshot::default(), &options);

        let changed = cycle.update_references(&backend).await.unwrap();
        assert_eq!(changed, vec![name("refs/heads/main")]);

        let again = cycle.update_references(&backend).await.unwrap();
        assert!(again.is_empty());

        backend.set_ref(name("refs/heads/main"), oid('b'));
        let moved = cycle.update_references(&backend).await.unwrap();
        assert_eq!(moved, vec![name("refs/heads/main")]);
    }

    #[tokio::test]
    async fn excluded_references_are_filtered() {
        let backend = backend();
        backend.set_ref(name("refs/notes/commits"), oid('a'));
        backend.set_ref(name("refs/tags/v1"), oid('a'));
        let options = GraphOptions {
            tags: false,
            ..GraphOptions::default()
        };
        let mut cycle = UpdateCycle::new(GraphSnapshot::default(), &options);

        let changed = cycle.update_references(&backend).await.unwrap();
        assert_eq!(changed, vec![name("refs/heads/main")]);
    }

    #[tokio::test]
    async fn walk_hides_known_commits() {
        let backend = backend();
        let options = GraphOptions::default();
        let mut cycle = UpdateCycle::new(GraphSnapshot::default(), &options);
        cycle.run(&backend).await.unwrap();

        backend.add_commit(commit('d', &['c'], 4));
        backend.set_ref(name("refs/heads/main"), oid('d'));
        backend.clear_operations();

        let changed = cycle.update_references(&backend).await.unwrap();
        let commits = cycle
            .integrate_new_commits(&backend, &changed, &[])
            .await
            .unwrap();
        assert_eq!(commits, vec![commit('d', &['c'], 4)]);

        let walk = backend
            .operations()
            .into_iter()
            .find_map(|op| match op {
                MockOperation::WalkAncestry { start, hide } => Some((start, hide)),
                _ => None,
            })
            .unwrap();
        assert_eq!(walk.0, vec![oid('d')]);
        assert_eq!(walk.1.len(), 3);
    }

    #[tokio::test]
    async fn no_walk_without_new_tips() {
        let backend = backend();
        let options = GraphOptions::default();
        let mut cycle = UpdateCycle::new(GraphSnapshot::default(), &options);
        cycle.run(&backend).await.unwrap();
        backend.clear_operations();

        cycle.run(&backend).await.unwrap();
        assert!(!backend
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::WalkAncestry { .. })));
    }

    #[tokio::test]
    async fn missing_parent_is_inconsistent() {
        let backend = MockBackend::new();
        // 'f' was never added, so the walk cannot return it
        backend.add_commit(commit('b', &['f'], 2));
        backend.set_ref(name("refs/heads/main"), oid('b'));
        let options = GraphOptions::default();
        let mut cycle = UpdateCycle::new(GraphSnapshot::default(), &options);

        let err = cycle.run(&backend).await.unwrap_err();
        assert!(matches!(
            err,
            UpdateError::InconsistentSnapshot {
                phase: UpdatePhase::Linking,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn backend_failure_carries_phase() {
        let backend = backend().fail_on(FailOn::ListStashes(BackendError::Unavailable(
            "locked".into(),
        )));
        let options = GraphOptions::default();
        let mut cycle = UpdateCycle::new(GraphSnapshot::default(), &options);

        let err = cycle.run(&backend).await.unwrap_err();
        assert_eq!(err.phase(), UpdatePhase::DiffingStashes);
        assert_eq!(cycle.phase(), UpdatePhase::DiffingStashes);
    }

    #[tokio::test]
    async fn disabled_stashes_are_never_listed() {
        let backend = backend();
        backend.push_stash(oid('c'));
        let options = GraphOptions {
            stashes: false,
            ..GraphOptions::default()
        };
        let mut cycle = UpdateCycle::new(GraphSnapshot::default(), &options);

        assert!(cycle.update_stashes(&backend).await.unwrap().is_empty());
        assert!(!backend.operations().contains(&MockOperation::ListStashes));
    }

    #[tokio::test]
    async fn stash_parents_beyond_mainline_are_hidden() {
        let backend = backend();
        backend.add_commit(commit('1', &['c'], 5));
        backend.add_commit(commit('2', &['c'], 5));
        backend.add_commit(commit('5', &['c', '1', '2'], 6));
        backend.push_stash(oid('5'));
        backend.set_head(HeadState {
            branch: Some(name("refs/heads/main")),
            oid: Some(oid('c')),
        });
        let options = GraphOptions::default();
        let mut cycle = UpdateCycle::new(GraphSnapshot::default(), &options);

        let summary = cycle.run(&backend).await.unwrap();
        assert_eq!(summary.hidden, 2);
        let state = cycle.into_snapshot();
        assert!(state.commit(&oid('1')).is_none());
        assert!(state.commit(&oid('2')).is_none());
        assert_eq!(state.graph().parents(&oid('5')), &[oid('c')]);
    }

    #[tokio::test]
    async fn referenced_stash_parent_is_walked_and_relinked() {
        let backend = backend();
        backend.add_commit(commit('1', &['c'], 5));
        backend.add_commit(commit('5', &['c', '1'], 6));
        backend.push_stash(oid('5'));
        let options = GraphOptions::default();
        let mut cycle = UpdateCycle::new(GraphSnapshot::default(), &options);
        cycle.run(&backend).await.unwrap();
        assert!(cycle.state().commit(&oid('1')).is_none());

        backend.set_ref(name("refs/heads/recover"), oid('1'));
        backend.clear_operations();
        let summary = cycle.run(&backend).await.unwrap();

        let walk = backend
            .operations()
            .into_iter()
            .find_map(|op| match op {
                MockOperation::WalkAncestry { start, hide } => Some((start, hide)),
                _ => None,
            })
            .unwrap();
        assert_eq!(walk.0, vec![oid('1')]);
        assert!(!walk.1.contains(&oid('5')));
        assert_eq!(summary.new_commits, 1);
        assert_eq!(summary.hidden, 0);
        assert_eq!(cycle.state().graph().parents(&oid('5')), &[oid('c'), oid('1')]);

        backend.delete_ref(&name("refs/heads/recover"));
        let summary = cycle.run(&backend).await.unwrap();
        assert_eq!(summary.hidden, 1);
        assert!(cycle.state().commit(&oid('1')).is_none());
        assert_eq!(cycle.state().graph().parents(&oid('5')), &[oid('c')]);
    }

    #[tokio::test]
    async fn hidden_stash_parents_are_not_walked_again() {
        let backend = backend();
        backend.add_commit(commit('1', &['c'], 5));
        backend.add_commit(commit('5', &['c', '1'], 6));
        backend.push_stash(oid('5'));
        let options = GraphOptions::default();
        let mut cycle = UpdateCycle::new(GraphSnapshot::default(), &options);
        cycle.run(&backend).await.unwrap();
        backend.clear_operations();

        let summary = cycle.run(&backend).await.unwrap();
        assert_eq!(summary.hidden, 0);
        assert!(!backend
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::WalkAncestry { .. })));
    }
}
