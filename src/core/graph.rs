//! core::graph
//!
//! Commit DAG representation and operations.
//!
//! # Architecture
//!
//! The commit graph is a DAG where:
//! - Nodes are commits, keyed by [`Oid`]
//! - `parents` maps a commit to its ordered parent list (index 0 = mainline)
//! - `children` is the inverse of `parents`, kept in lockstep
//!
//! Commits never hold back-pointers to their children. Both maps are owned
//! here and every mutation ([`CommitGraph::link`], [`CommitGraph::remove`],
//! [`CommitGraph::retain_parents`]) patches them together.
//!
//! # Invariants
//!
//! - `children` is exactly the inverse of `parents`
//! - Every parent id in `parents` names a commit in the graph
//! - [`CommitGraph::order`] is a topological order over `children` (children
//!   first) that otherwise follows descending author time
//!
//! All traversals use explicit work stacks; history depth is unbounded.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::Oid;

/// A commit as fetched from the backend. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// The commit id
    pub oid: Oid,
    /// Parent ids as recorded in the commit (index 0 = mainline)
    pub parents: Vec<Oid>,
    /// Author timestamp
    pub author_time: DateTime<Utc>,
    /// First line of the commit message
    pub summary: String,
}

/// Errors from graph consistency checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A commit names a parent the graph does not hold.
    #[error("commit {child} points at absent parent {parent}")]
    MissingParent {
        /// The commit holding the dangling edge
        child: Oid,
        /// The parent that could not be found
        parent: Oid,
    },

    /// The children map disagrees with the parents map.
    #[error("children of {oid} out of sync with parent lists")]
    ChildrenOutOfSync {
        /// The commit whose children list is wrong
        oid: Oid,
    },

    /// The sorted order does not cover the graph.
    #[error("sorted order holds {ordered} commits but graph holds {known}")]
    OrderOutOfSync {
        /// Commits in the order
        ordered: usize,
        /// Commits in the graph
        known: usize,
    },
}

/// The commit graph with parent/child adjacency and a sorted order.
#[derive(Debug, Clone, Default)]
pub struct CommitGraph {
    /// Commit data by id
    commits: HashMap<Oid, Commit>,
    /// Parent lists, restricted to commits in the graph
    parents: HashMap<Oid, Vec<Oid>>,
    /// Children lists (derived from parents)
    children: HashMap<Oid, Vec<Oid>>,
    /// Total order produced by [`CommitGraph::sort`]
    order: Vec<Oid>,
    /// Position of each commit in `order`
    rows: HashMap<Oid, usize>,
}

impl CommitGraph {
    /// Create an empty commit graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commits in the graph.
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Check if the graph holds no commits.
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Check if a commit is in the graph.
    pub fn contains(&self, oid: &Oid) -> bool {
        self.commits.contains_key(oid)
    }

    /// Get a commit's data.
    pub fn commit(&self, oid: &Oid) -> Option<&Commit> {
        self.commits.get(oid)
    }

    /// All commit ids, in no particular order.
    pub fn oids(&self) -> impl Iterator<Item = &Oid> {
        self.commits.keys()
    }

    /// Parents of a commit that are present in the graph.
    ///
    /// Empty for root commits and unknown ids.
    pub fn parents(&self, oid: &Oid) -> &[Oid] {
        self.parents.get(oid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Children of a commit.
    ///
    /// Empty for tips and unknown ids.
    pub fn children(&self, oid: &Oid) -> &[Oid] {
        self.children.get(oid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check if `oid` is the mainline (first) parent of `child`.
    pub fn is_mainline_parent(&self, child: &Oid, oid: &Oid) -> bool {
        self.parents(child).first() == Some(oid)
    }

    /// Add a batch of new commits and link them to their parents.
    ///
    /// Every parent must either be in the graph already or be part of the
    /// same batch. Commits already in the graph are ignored. The batch is
    /// validated up front, so on error the graph is untouched.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::DateTime;
    /// use lanegraph::core::graph::{Commit, CommitGraph};
    /// use lanegraph::core::types::Oid;
    ///
    /// let a = Oid::new("a".repeat(40)).unwrap();
    /// let b = Oid::new("b".repeat(40)).unwrap();
    /// let commit = |oid: &Oid, parents: Vec<Oid>, t| Commit {
    ///     oid: oid.clone(),
    ///     parents,
    ///     author_time: DateTime::from_timestamp(t, 0).unwrap(),
    ///     summary: String::new(),
    /// };
    ///
    /// let mut graph = CommitGraph::new();
    /// graph
    ///     .link(vec![commit(&b, vec![a.clone()], 2), commit(&a, vec![], 1)])
    ///     .unwrap();
    ///
    /// assert_eq!(graph.parents(&b), &[a.clone()]);
    /// assert_eq!(graph.children(&a), &[b.clone()]);
    /// ```
    pub fn link(&mut self, commits: Vec<Commit>) -> Result<(), GraphError> {
        let batch: HashSet<&Oid> = commits.iter().map(|c| &c.oid).collect();
        for commit in &commits {
            for parent in &commit.parents {
                if !self.contains(parent) && !batch.contains(parent) {
                    return Err(GraphError::MissingParent {
                        child: commit.oid.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        let fresh: Vec<Commit> = commits
            .into_iter()
            .filter(|c| !self.commits.contains_key(&c.oid))
            .collect();

        for commit in &fresh {
            self.children.entry(commit.oid.clone()).or_default();
        }
        for commit in fresh {
            for parent in &commit.parents {
                self.children
                    .entry(parent.clone())
                    .or_default()
                    .push(commit.oid.clone());
            }
            self.parents
                .insert(commit.oid.clone(), commit.parents.clone());
            self.commits.insert(commit.oid.clone(), commit);
        }
        Ok(())
    }

    /// Remove a commit and every edge touching it.
    ///
    /// The commit disappears from its parents' children lists and from its
    /// children's parent lists, so no dangling entry survives. Returns
    /// `false` if the commit was not in the graph.
    pub fn remove(&mut self, oid: &Oid) -> bool {
        if !self.unlink(oid) {
            return false;
        }
        if self.rows.remove(oid).is_some() {
            self.order.retain(|o| o != oid);
            self.reindex();
        }
        true
    }

    /// Drop a commit from both adjacency maps, leaving the order alone.
    fn unlink(&mut self, oid: &Oid) -> bool {
        if self.commits.remove(oid).is_none() {
            return false;
        }
        for parent in self.parents.remove(oid).unwrap_or_default() {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|c| c != oid);
            }
        }
        for child in self.children.remove(oid).unwrap_or_default() {
            if let Some(parents) = self.parents.get_mut(&child) {
                parents.retain(|p| p != oid);
            }
        }
        true
    }

    /// Drop the parent edges of `oid` that `keep` rejects.
    ///
    /// The parents stay in the graph; only the edges go. Returns the
    /// dropped parents, empty for unknown ids.
    pub fn retain_parents(&mut self, oid: &Oid, mut keep: impl FnMut(&Oid) -> bool) -> Vec<Oid> {
        let Some(parents) = self.parents.get_mut(oid) else {
            return Vec::new();
        };
        let (kept, dropped): (Vec<Oid>, Vec<Oid>) = parents.drain(..).partition(|p| keep(p));
        *parents = kept;

        for parent in &dropped {
            if let Some(siblings) = self.children.get_mut(parent) {
                siblings.retain(|c| c != oid);
            }
        }
        dropped
    }

    /// Relink every commit to the recorded parents the graph holds again.
    ///
    /// Parent order follows the commit. Returns the commits that gained an
    /// edge, sorted.
    pub fn restore_parents(&mut self) -> Vec<Oid> {
        let mut updates: Vec<(Oid, Vec<Oid>)> = self
            .commits
            .values()
            .filter(|c| self.parents(&c.oid).len() < c.parents.len())
            .filter_map(|c| {
                let present: Vec<Oid> = c
                    .parents
                    .iter()
                    .filter(|p| self.contains(p))
                    .cloned()
                    .collect();
                (present.len() > self.parents(&c.oid).len()).then(|| (c.oid.clone(), present))
            })
            .collect();
        updates.sort();

        let mut restored = Vec::with_capacity(updates.len());
        for (oid, present) in updates {
            let added: Vec<Oid> = present
                .iter()
                .filter(|p| !self.parents(&oid).contains(p))
                .cloned()
                .collect();
            for parent in added {
                self.children.entry(parent).or_default().push(oid.clone());
            }
            self.parents.insert(oid.clone(), present);
            restored.push(oid);
        }
        restored
    }

    /// Commits linked to fewer parents than they record, plus everything
    /// descending from them.
    pub fn trimmed(&self) -> HashSet<Oid> {
        let mut seen = HashSet::new();
        let mut frontier: Vec<&Oid> = self
            .commits
            .values()
            .filter(|c| self.parents(&c.oid).len() < c.parents.len())
            .map(|c| &c.oid)
            .collect();

        while let Some(oid) = frontier.pop() {
            if seen.insert(oid.clone()) {
                frontier.extend(self.children(oid));
            }
        }
        seen
    }

    /// Every commit reachable from `tips` by following parent edges.
    ///
    /// Tips that are not in the graph are ignored.
    pub fn reachable<'a>(&self, tips: impl IntoIterator<Item = &'a Oid>) -> HashSet<Oid> {
        let mut seen = HashSet::new();
        let mut frontier: Vec<&Oid> = Vec::new();

        for tip in tips {
            if self.contains(tip) && seen.insert(tip.clone()) {
                frontier.push(tip);
            }
        }
        while let Some(oid) = frontier.pop() {
            for parent in self.parents(oid) {
                if seen.insert(parent.clone()) {
                    frontier.push(parent);
                }
            }
        }

        seen
    }

    /// Remove every commit not reachable from `tips`.
    ///
    /// Returns the removed ids, sorted.
    pub fn prune_unreachable<'a>(&mut self, tips: impl IntoIterator<Item = &'a Oid>) -> Vec<Oid> {
        let keep = self.reachable(tips);
        let mut doomed: Vec<Oid> = self
            .commits
            .keys()
            .filter(|oid| !keep.contains(*oid))
            .cloned()
            .collect();
        doomed.sort();

        for oid in &doomed {
            self.unlink(oid);
        }
        if !doomed.is_empty() {
            self.order.retain(|o| keep.contains(o));
            self.reindex();
        }
        doomed
    }

    /// Compute the total order of commits.
    ///
    /// Commits are first ranked by descending author time (ties by
    /// ascending id). A post-order walk over `children`, seeded in rank
    /// order and visiting children in rank order, then emits each commit
    /// only once all of its children have been emitted.
    ///
    /// The result depends only on the adjacency and timestamps, so sorting
    /// an unchanged graph twice yields the same order.
    pub fn sort(&mut self) -> &[Oid] {
        self.order = self.sorted_order();
        self.reindex();
        &self.order
    }

    fn sorted_order(&self) -> Vec<Oid> {
        let mut ranked: Vec<&Commit> = self.commits.values().collect();
        ranked.sort_by(|a, b| {
            b.author_time
                .cmp(&a.author_time)
                .then_with(|| a.oid.cmp(&b.oid))
        });
        let rank: HashMap<&Oid, usize> = ranked
            .iter()
            .enumerate()
            .map(|(i, c)| (&c.oid, i))
            .collect();

        let ranked_children: HashMap<&Oid, Vec<&Oid>> = self
            .children
            .iter()
            .map(|(oid, children)| {
                let mut sorted: Vec<&Oid> = children.iter().collect();
                sorted.sort_by_key(|c| rank.get(c).copied().unwrap_or(usize::MAX));
                (oid, sorted)
            })
            .collect();

        let mut order = Vec::with_capacity(ranked.len());
        let mut seen: HashSet<&Oid> = HashSet::with_capacity(ranked.len());
        // (commit, index of the next child to visit)
        let mut stack: Vec<(&Oid, usize)> = Vec::new();

        for commit in &ranked {
            if !seen.insert(&commit.oid) {
                continue;
            }
            stack.push((&commit.oid, 0));

            while let Some((oid, next)) = stack.last_mut() {
                let children = ranked_children
                    .get(*oid)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                if let Some(&child) = children.get(*next) {
                    *next += 1;
                    if seen.insert(child) {
                        stack.push((child, 0));
                    }
                } else {
                    order.push((*oid).clone());
                    stack.pop();
                }
            }
        }

        order
    }

    /// The order computed by the last [`CommitGraph::sort`].
    pub fn order(&self) -> &[Oid] {
        &self.order
    }

    /// Position of a commit in [`CommitGraph::order`] (0-based).
    pub fn index_of(&self, oid: &Oid) -> Option<usize> {
        self.rows.get(oid).copied()
    }

    /// Check the adjacency invariants.
    ///
    /// # Errors
    ///
    /// - [`GraphError::MissingParent`] if a parent list names an absent commit
    /// - [`GraphError::ChildrenOutOfSync`] if `children` is not the inverse of `parents`
    /// - [`GraphError::OrderOutOfSync`] if the sorted order does not cover the graph
    pub fn verify(&self) -> Result<(), GraphError> {
        let mut expected: HashMap<&Oid, Vec<&Oid>> =
            self.commits.keys().map(|oid| (oid, Vec::new())).collect();

        for (child, parents) in &self.parents {
            for parent in parents {
                match expected.get_mut(parent) {
                    Some(list) => list.push(child),
                    None => {
                        return Err(GraphError::MissingParent {
                            child: child.clone(),
                            parent: parent.clone(),
                        })
                    }
                }
            }
        }

        for (oid, mut want) in expected {
            let mut have: Vec<&Oid> = self.children(oid).iter().collect();
            want.sort();
            have.sort();
            if want != have || !self.parents.contains_key(oid) {
                return Err(GraphError::ChildrenOutOfSync { oid: oid.clone() });
            }
        }
        if self.children.len() != self.commits.len() {
            if let Some(stray) = self.children.keys().find(|k| !self.contains(k)) {
                return Err(GraphError::ChildrenOutOfSync { oid: stray.clone() });
            }
        }

        if self.order.len() != self.commits.len() {
            return Err(GraphError::OrderOutOfSync {
                ordered: self.order.len(),
                known: self.commits.len(),
            });
        }
        Ok(())
    }

    fn reindex(&mut self) {
        self.rows = self
            .order
            .iter()
            .enumerate()
            .map(|(i, oid)| (oid.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u32) -> Oid {
        Oid::new(format!("{:040x}", n)).unwrap()
    }

    fn commit(n: u32, parents: &[u32], time: i64) -> Commit {
        Commit {
            oid: oid(n),
            parents: parents.iter().map(|p| oid(*p)).collect(),
            author_time: DateTime::from_timestamp(time, 0).unwrap(),
            summary: format!("commit {n}"),
        }
    }

    /// 1 <- 2 <- 3, with 4 branching off 2.
    fn small_tree() -> CommitGraph {
        let mut graph = CommitGraph::new();
        graph
            .link(vec![
                commit(1, &[], 100),
                commit(2, &[1], 200),
                commit(3, &[2], 300),
                commit(4, &[2], 250),
            ])
            .unwrap();
        graph
    }

    #[test]
    fn empty_graph() {
        let mut graph = CommitGraph::new();
        assert!(graph.is_empty());
        assert!(graph.sort().is_empty());
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn link_builds_inverse_adjacency() {
        let graph = small_tree();
        let mut children: Vec<_> = graph.children(&oid(2)).to_vec();
        children.sort();
        assert_eq!(children, vec![oid(3), oid(4)]);
        assert_eq!(graph.parents(&oid(3)), &[oid(2)]);
        assert!(graph.children(&oid(3)).is_empty());
    }

    #[test]
    fn link_rejects_absent_parent_without_mutating() {
        let mut graph = small_tree();
        let err = graph
            .link(vec![commit(9, &[8], 900), commit(10, &[9], 1000)])
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingParent {
                child: oid(9),
                parent: oid(8)
            }
        );
        assert_eq!(graph.len(), 4);
        assert!(!graph.contains(&oid(10)));
    }

    #[test]
    fn link_ignores_known_commits() {
        let mut graph = small_tree();
        graph.link(vec![commit(3, &[2], 300)]).unwrap();
        assert_eq!(graph.children(&oid(2)).len(), 2);
    }

    #[test]
    fn remove_cleans_both_sides() {
        let mut graph = small_tree();
        graph.sort();
        assert!(graph.remove(&oid(2)));
        assert!(graph.parents(&oid(3)).is_empty());
        assert!(graph.children(&oid(1)).is_empty());
        assert!(!graph.remove(&oid(2)));
        assert!(graph.index_of(&oid(2)).is_none());
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn retained_parents_keep_the_commit() {
        let mut graph = CommitGraph::new();
        graph
            .link(vec![
                commit(1, &[], 100),
                commit(2, &[], 100),
                commit(3, &[1, 2], 200),
            ])
            .unwrap();
        graph.sort();

        let dropped = graph.retain_parents(&oid(3), |p| *p == oid(1));
        assert_eq!(dropped, vec![oid(2)]);
        assert_eq!(graph.parents(&oid(3)), &[oid(1)]);
        assert!(graph.children(&oid(2)).is_empty());
        assert!(graph.contains(&oid(2)));
        assert!(graph.verify().is_ok());
        assert!(graph.retain_parents(&oid(99), |_| false).is_empty());
    }

    #[test]
    fn restore_relinks_in_recorded_order() {
        let mut graph = CommitGraph::new();
        graph
            .link(vec![
                commit(1, &[], 100),
                commit(2, &[], 100),
                commit(3, &[1, 2], 200),
            ])
            .unwrap();
        graph.retain_parents(&oid(3), |_| false);
        assert!(graph.parents(&oid(3)).is_empty());

        assert_eq!(graph.restore_parents(), vec![oid(3)]);
        assert_eq!(graph.parents(&oid(3)), &[oid(1), oid(2)]);
        assert_eq!(graph.children(&oid(2)), &[oid(3)]);
        assert!(graph.restore_parents().is_empty());
    }

    #[test]
    fn restore_skips_absent_parents() {
        let mut graph = CommitGraph::new();
        graph
            .link(vec![
                commit(1, &[], 100),
                commit(2, &[], 100),
                commit(3, &[1, 2], 200),
            ])
            .unwrap();
        graph.retain_parents(&oid(3), |p| *p == oid(1));
        graph.remove(&oid(2));

        assert!(graph.restore_parents().is_empty());
        assert_eq!(graph.parents(&oid(3)), &[oid(1)]);
    }

    #[test]
    fn trimmed_covers_descendants() {
        let mut graph = CommitGraph::new();
        graph
            .link(vec![
                commit(1, &[], 100),
                commit(2, &[], 100),
                commit(3, &[1, 2], 200),
                commit(4, &[3], 300),
                commit(5, &[1], 300),
            ])
            .unwrap();
        assert!(graph.trimmed().is_empty());

        graph.retain_parents(&oid(3), |p| *p == oid(1));
        let trimmed = graph.trimmed();
        assert_eq!(trimmed, [oid(3), oid(4)].into_iter().collect());
    }

    #[test]
    fn prune_keeps_reachable() {
        let mut graph = small_tree();
        let removed = graph.prune_unreachable([&oid(4)]);
        assert_eq!(removed, vec![oid(3)]);
        assert!(graph.contains(&oid(1)));
        assert!(graph.contains(&oid(2)));
        assert!(graph.children(&oid(2)) == [oid(4)]);
    }

    #[test]
    fn prune_ignores_unknown_tips() {
        let mut graph = small_tree();
        let removed = graph.prune_unreachable([&oid(3), &oid(77)]);
        assert_eq!(removed, vec![oid(4)]);
    }

    #[test]
    fn sort_puts_children_first_and_newest_first() {
        let mut graph = small_tree();
        let order = graph.sort().to_vec();
        assert_eq!(order, vec![oid(3), oid(4), oid(2), oid(1)]);
        assert_eq!(graph.index_of(&oid(1)), Some(3));
    }

    #[test]
    fn sort_respects_topology_over_clock_skew() {
        // Parent claims to be newer than its child.
        let mut graph = CommitGraph::new();
        graph
            .link(vec![commit(1, &[], 500), commit(2, &[1], 100)])
            .unwrap();
        assert_eq!(graph.sort(), &[oid(2), oid(1)]);
    }

    #[test]
    fn sort_breaks_time_ties_by_id() {
        let mut graph = CommitGraph::new();
        graph
            .link(vec![commit(7, &[], 100), commit(3, &[], 100)])
            .unwrap();
        assert_eq!(graph.sort(), &[oid(3), oid(7)]);
    }

    #[test]
    fn sort_is_idempotent() {
        let mut graph = small_tree();
        let first = graph.sort().to_vec();
        let second = graph.sort().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn sort_handles_deep_history() {
        let mut graph = CommitGraph::new();
        let commits: Vec<Commit> = (1..=50_000u32)
            .map(|n| {
                let parents: Vec<u32> = if n == 1 { vec![] } else { vec![n - 1] };
                commit(n, &parents, n as i64)
            })
            .collect();
        graph.link(commits).unwrap();
        let order = graph.sort();
        assert_eq!(order.first(), Some(&oid(50_000)));
        assert_eq!(order.last(), Some(&oid(1)));
        assert!(graph.reachable([&oid(50_000)]).len() == 50_000);
    }

    #[test]
    fn verify_detects_missing_order() {
        let graph = small_tree();
        assert!(matches!(
            graph.verify(),
            Err(GraphError::OrderOutOfSync { .. })
        ));
    }
}
