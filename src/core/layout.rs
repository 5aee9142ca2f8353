//! core::layout
//!
//! Lane assignment for the commit graph.
//!
//! # Algorithm
//!
//! A single forward pass over [`CommitGraph::order`]. Row 0 belongs to the
//! working/staging node, which holds lane 0 until HEAD is placed; commits
//! start at row 1. For each commit:
//!
//! 1. Lanes of already-recorded edges spanning the rows between the
//!    commit's earliest merge child and the commit itself are forbidden.
//! 2. HEAD takes over lane 0. Any other commit takes over the lowest
//!    non-forbidden lane of a child it is the mainline parent of.
//! 3. Failing that, the commit goes into the nearest free, non-forbidden
//!    lane around its earliest child (or around lane 0 if it has none),
//!    appending a lane when nothing is free.
//! 4. Every other child it is the mainline parent of gives up its lane.
//! 5. Edges from its children to it are recorded for step 1 of later
//!    commits.
//!
//! The nearest-lane search looks at distance 1, 2, ... from the anchor and
//! at each distance tries the lower lane before the higher one.
//!
//! # Invariants
//!
//! - Every parent sits on a strictly greater row than its child
//! - A lane holds one commit at a time; a commit keeps its lane until its
//!   mainline parent takes it over or frees it

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::graph::CommitGraph;
use super::interval::IntervalTree;
use super::types::Oid;

/// What a positioned node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A regular commit
    Commit,
    /// A stash entry
    Stash,
}

/// A grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub row: usize,
    pub lane: usize,
}

/// Layout datum for a single commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Node {
    pub row: usize,
    pub lane: usize,
    pub kind: NodeKind,
}

impl Node {
    /// The node's grid coordinate.
    pub fn point(&self) -> Point {
        Point {
            row: self.row,
            lane: self.lane,
        }
    }
}

/// Kind of a parent edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Edge to the mainline (first) parent
    Normal,
    /// Edge to any other parent
    Merge,
}

/// An edge from a commit to one of its parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub child: Oid,
    pub parent: Oid,
    pub from: Point,
    pub to: Point,
    pub kind: EdgeKind,
}

impl Edge {
    /// Lane the edge runs in on the rows strictly between its endpoints.
    ///
    /// Mainline edges stay in the child's lane; merge edges run in the
    /// parent's lane.
    pub fn lane(&self) -> usize {
        match self.kind {
            EdgeKind::Normal => self.from.lane,
            EdgeKind::Merge => self.to.lane,
        }
    }
}

/// Edges indexed by the rows they span.
#[derive(Debug, Clone, Default)]
pub struct EdgeIndex {
    tree: IntervalTree<Edge>,
}

impl EdgeIndex {
    /// Every edge whose row span overlaps `[first, last]`.
    ///
    /// Sorted by child row, then parent row, then lane, so renderers get a
    /// stable draw order.
    pub fn in_rows(&self, first: usize, last: usize) -> Vec<&Edge> {
        let mut edges = self.tree.search(first, last);
        edges.sort_by_key(|e| (e.from.row, e.to.row, e.from.lane, e.to.lane));
        edges
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Check if there are no edges.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// All edges, in child row order.
    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.tree.iter().map(|(_, _, edge)| edge)
    }
}

/// Occupant of a lane while the layout pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occupant<'a> {
    /// The working/staging node, until HEAD replaces it
    Working,
    Commit(&'a Oid),
}

/// Computed positions for every commit plus the edge index.
#[derive(Debug, Clone)]
pub struct LaneLayout {
    positions: HashMap<Oid, Node>,
    width: usize,
    edges: EdgeIndex,
}

/// The layout of an empty graph: only the working lane.
impl Default for LaneLayout {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            width: Self::WORKING_LANE + 1,
            edges: EdgeIndex::default(),
        }
    }
}

impl LaneLayout {
    /// Row of the synthetic working/staging node.
    pub const WORKING_ROW: usize = 0;
    /// Lane of the synthetic working/staging node.
    pub const WORKING_LANE: usize = 0;

    /// Lay out the graph in its current sorted order.
    ///
    /// `head` is the commit HEAD points at, if any. `is_stash` marks commits
    /// that should render as stash nodes.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::DateTime;
    /// use lanegraph::core::graph::{Commit, CommitGraph};
    /// use lanegraph::core::layout::LaneLayout;
    /// use lanegraph::core::types::Oid;
    ///
    /// let a = Oid::new("a".repeat(40)).unwrap();
    /// let b = Oid::new("b".repeat(40)).unwrap();
    /// let mut graph = CommitGraph::new();
    /// graph.link(vec![
    ///     Commit { oid: a.clone(), parents: vec![], author_time: DateTime::from_timestamp(1, 0).unwrap(), summary: "root".into() },
    ///     Commit { oid: b.clone(), parents: vec![a.clone()], author_time: DateTime::from_timestamp(2, 0).unwrap(), summary: "tip".into() },
    /// ]).unwrap();
    /// graph.sort();
    ///
    /// let layout = LaneLayout::compute(&graph, Some(&b), |_| false);
    /// assert_eq!(layout.position_of(&b).map(|n| (n.row, n.lane)), Some((1, 0)));
    /// assert_eq!(layout.position_of(&a).map(|n| (n.row, n.lane)), Some((2, 0)));
    /// assert_eq!(layout.width(), 1);
    /// ```
    pub fn compute(graph: &CommitGraph, head: Option<&Oid>, is_stash: impl Fn(&Oid) -> bool) -> Self {
        let mut positions: HashMap<Oid, Node> = HashMap::with_capacity(graph.len());
        let mut lanes: Vec<Option<Occupant>> = vec![Some(Occupant::Working)];
        // Row span of every edge placed so far, tagged with the lane it runs in.
        let mut spans: IntervalTree<usize> = IntervalTree::new();

        for (index, oid) in graph.order().iter().enumerate() {
            let row = index + 1;
            let children = graph.children(oid);
            let placed = |child: &Oid| positions.get(child).copied();

            let merge_rows = children
                .iter()
                .filter(|c| !graph.is_mainline_parent(c, oid))
                .filter_map(|c| placed(c).map(|n| n.row));
            let first_row = merge_rows.min().unwrap_or(row).min(row);
            let forbidden: HashSet<usize> = spans.search(first_row, row).into_iter().copied().collect();

            // (lane, child whose slot is taken over)
            let replacement: Option<(usize, Option<&Oid>)> = if head == Some(oid) {
                Some((Self::WORKING_LANE, None))
            } else {
                children
                    .iter()
                    .filter(|c| graph.is_mainline_parent(c, oid))
                    .filter_map(|c| placed(c).map(|n| (n.lane, Some(c))))
                    .filter(|(lane, _)| !forbidden.contains(lane))
                    .min_by_key(|(lane, _)| *lane)
            };

            let (lane, replaced) = match replacement {
                Some((lane, replaced)) => {
                    lanes[lane] = Some(Occupant::Commit(oid));
                    (lane, replaced)
                }
                None => {
                    let anchor = children
                        .iter()
                        .filter_map(|c| placed(c))
                        .min_by_key(|n| n.row)
                        .map(|n| n.lane);
                    let lane = match anchor {
                        Some(anchor) => insert_near(&mut lanes, oid, anchor, &forbidden),
                        None => insert_near(&mut lanes, oid, Self::WORKING_LANE, &HashSet::new()),
                    };
                    (lane, None)
                }
            };

            for child in children {
                if Some(child) == replaced || !graph.is_mainline_parent(child, oid) {
                    continue;
                }
                if let Some(node) = placed(child) {
                    if lanes.get(node.lane) == Some(&Some(Occupant::Commit(child))) {
                        lanes[node.lane] = None;
                    }
                }
            }

            for child in children {
                let Some(node) = placed(child) else {
                    continue;
                };
                let edge_lane = if graph.is_mainline_parent(child, oid) {
                    node.lane
                } else {
                    lane
                };
                spans.insert(node.row, row - 1, edge_lane);
            }

            let kind = if is_stash(oid) {
                NodeKind::Stash
            } else {
                NodeKind::Commit
            };
            positions.insert(oid.clone(), Node { row, lane, kind });
        }

        let edges = Self::index_edges(graph, &positions);
        Self {
            width: lanes.len(),
            positions,
            edges,
        }
    }

    /// Build the render-time edge index from final positions.
    fn index_edges(graph: &CommitGraph, positions: &HashMap<Oid, Node>) -> EdgeIndex {
        let mut tree = IntervalTree::new();
        for oid in graph.order() {
            let Some(from) = positions.get(oid) else {
                continue;
            };
            for (i, parent) in graph.parents(oid).iter().enumerate() {
                let Some(to) = positions.get(parent) else {
                    continue;
                };
                let kind = if i > 0 { EdgeKind::Merge } else { EdgeKind::Normal };
                tree.insert(
                    from.row,
                    to.row,
                    Edge {
                        child: oid.clone(),
                        parent: parent.clone(),
                        from: from.point(),
                        to: to.point(),
                        kind,
                    },
                );
            }
        }
        EdgeIndex { tree }
    }

    /// Position of a commit, or `None` if it is not laid out.
    pub fn position_of(&self, oid: &Oid) -> Option<&Node> {
        self.positions.get(oid)
    }

    /// Number of lanes, for sizing the drawing surface.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The edge index.
    pub fn edges(&self) -> &EdgeIndex {
        &self.edges
    }

    /// Edges whose row span overlaps `[first, last]`.
    pub fn edges_in_rows(&self, first: usize, last: usize) -> Vec<&Edge> {
        self.edges.in_rows(first, last)
    }
}

/// Put `oid` in the free, non-forbidden lane closest to `anchor`.
///
/// At equal distance the lower lane wins. Appends a lane if none is free.
fn insert_near<'a>(
    lanes: &mut Vec<Option<Occupant<'a>>>,
    oid: &'a Oid,
    anchor: usize,
    forbidden: &HashSet<usize>,
) -> usize {
    let mut distance = 1;
    while distance <= anchor || anchor + distance < lanes.len() {
        if distance <= anchor && is_free(lanes, anchor - distance, forbidden) {
            lanes[anchor - distance] = Some(Occupant::Commit(oid));
            return anchor - distance;
        }
        if anchor + distance < lanes.len() && is_free(lanes, anchor + distance, forbidden) {
            lanes[anchor + distance] = Some(Occupant::Commit(oid));
            return anchor + distance;
        }
        distance += 1;
    }

    lanes.push(Some(Occupant::Commit(oid)));
    lanes.len() - 1
}

fn is_free(lanes: &[Option<Occupant<'_>>], lane: usize, forbidden: &HashSet<usize>) -> bool {
    lanes[lane].is_none() && !forbidden.contains(&lane)
}
