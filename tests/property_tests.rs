//! Property-based tests for the commit graph and lane layout.
//!
//! These tests use proptest to generate random commit DAGs (with arbitrary
//! and frequently tied timestamps) and check the ordering and layout
//! invariants hold for every one of them.

use std::collections::HashSet;

use chrono::DateTime;
use proptest::prelude::*;

use lanegraph::backend::mock::MockBackend;
use lanegraph::core::graph::{Commit, CommitGraph};
use lanegraph::core::layout::{EdgeKind, LaneLayout};
use lanegraph::core::types::{Oid, RefName};
use lanegraph::engine::{GraphModel, GraphOptions, GraphSnapshot};

fn oid(n: usize) -> Oid {
    Oid::new(format!("{:040x}", n + 1)).unwrap()
}

/// Raw shape of one generated commit: timestamp plus up to three parent picks.
type RawCommit = (u8, Vec<prop::sample::Index>);

/// Strategy for a random DAG of 1..40 commits.
///
/// Commit `i` only picks parents among `0..i`, so the result is acyclic.
fn dag() -> impl Strategy<Value = Vec<Commit>> {
    prop::collection::vec(
        (any::<u8>(), prop::collection::vec(any::<prop::sample::Index>(), 0..3)),
        1..40,
    )
    .prop_map(|raw: Vec<RawCommit>| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (time, picks))| {
                let mut parents: Vec<Oid> = Vec::new();
                if i > 0 {
                    for pick in picks {
                        let parent = oid(pick.index(i));
                        if !parents.contains(&parent) {
                            parents.push(parent);
                        }
                    }
                }
                Commit {
                    oid: oid(i),
                    parents,
                    author_time: DateTime::from_timestamp(i64::from(time), 0).unwrap(),
                    summary: format!("commit {i}"),
                }
            })
            .collect()
    })
}

/// Commits nothing else lists as a parent.
fn heads(commits: &[Commit]) -> Vec<Oid> {
    let parents: HashSet<&Oid> = commits.iter().flat_map(|c| c.parents.iter()).collect();
    commits
        .iter()
        .map(|c| &c.oid)
        .filter(|oid| !parents.contains(oid))
        .cloned()
        .collect()
}

fn sorted_graph(commits: &[Commit]) -> CommitGraph {
    let mut graph = CommitGraph::new();
    graph.link(commits.to_vec()).unwrap();
    graph.sort();
    graph
}

fn branch(i: usize) -> RefName {
    RefName::new(format!("refs/heads/b{i}")).unwrap()
}

fn backend_with(commits: &[Commit]) -> MockBackend {
    let backend = MockBackend::new();
    for commit in commits {
        backend.add_commit(commit.clone());
    }
    backend
}

fn update(model: &mut GraphModel, backend: &MockBackend) {
    tokio_test::block_on(model.update(backend)).unwrap();
}

fn assert_same_layout(a: &GraphSnapshot, b: &GraphSnapshot) -> Result<(), TestCaseError> {
    prop_assert_eq!(a.ordered_commits(), b.ordered_commits());
    for oid in b.ordered_commits() {
        prop_assert_eq!(a.position_of(oid), b.position_of(oid));
    }
    prop_assert_eq!(a.width(), b.width());
    let rows = b.len() + 1;
    prop_assert_eq!(a.edges_in_row_range(0, rows), b.edges_in_row_range(0, rows));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    /// Every parent is ordered after each of its children.
    #[test]
    fn parents_sort_below_children(commits in dag()) {
        let graph = sorted_graph(&commits);
        prop_assert_eq!(graph.order().len(), commits.len());
        for commit in &commits {
            let child = graph.index_of(&commit.oid).unwrap();
            for parent in &commit.parents {
                prop_assert!(graph.index_of(parent).unwrap() > child);
            }
        }
        graph.verify().unwrap();
    }

    /// Sorting is a function of the graph: repeating it or linking in a
    /// different order changes nothing.
    #[test]
    fn sort_is_deterministic(commits in dag()) {
        let mut graph = sorted_graph(&commits);
        let first = graph.order().to_vec();
        prop_assert_eq!(graph.sort(), first.as_slice());

        let mut reversed = commits.clone();
        reversed.reverse();
        let reversed_graph = sorted_graph(&reversed);
        prop_assert_eq!(reversed_graph.order(), first.as_slice());
    }

    /// Rows are dense, every node fits the width, and no mainline edge runs
    /// through a node sitting in its lane.
    #[test]
    fn layout_keeps_lanes_exclusive(commits in dag(), head in any::<prop::sample::Index>()) {
        let graph = sorted_graph(&commits);
        let head = graph.order()[head.index(graph.len())].clone();
        let layout = LaneLayout::compute(&graph, Some(&head), |_| false);

        let mut rows: Vec<usize> = Vec::new();
        for oid in graph.order() {
            let node = layout.position_of(oid).unwrap();
            prop_assert!(node.lane < layout.width());
            rows.push(node.row);
        }
        prop_assert_eq!(rows, (1..=graph.len()).collect::<Vec<_>>());
        prop_assert_eq!(layout.position_of(&head).map(|n| n.lane), Some(LaneLayout::WORKING_LANE));

        for edge in layout.edges().iter() {
            prop_assert!(edge.from.row < edge.to.row);
            if edge.kind != EdgeKind::Normal {
                continue;
            }
            for oid in graph.order() {
                let node = layout.position_of(oid).unwrap();
                if edge.from.row < node.row && node.row < edge.to.row {
                    prop_assert_ne!(
                        node.lane,
                        edge.lane(),
                        "edge {:?} passes through node at {:?}",
                        edge,
                        node
                    );
                }
            }
        }
    }

    /// Every parent edge is indexed, and a row query returns exactly the
    /// edges spanning that row.
    #[test]
    fn edge_index_answers_row_queries(commits in dag(), pick in any::<prop::sample::Index>()) {
        let graph = sorted_graph(&commits);
        let layout = LaneLayout::compute(&graph, None, |_| false);

        let expected: usize = commits.iter().map(|c| c.parents.len()).sum();
        prop_assert_eq!(layout.edges().len(), expected);

        let row = pick.index(graph.len()) + 1;
        let hits = layout.edges_in_rows(row, row);
        let brute = layout
            .edges()
            .iter()
            .filter(|e| e.from.row <= row && row <= e.to.row)
            .count();
        prop_assert_eq!(hits.len(), brute);
    }

    /// Pruning keeps exactly what the remaining tips reach.
    #[test]
    fn prune_keeps_reachable_set(commits in dag(), keep in any::<prop::sample::Index>()) {
        let mut graph = sorted_graph(&commits);
        let tips = heads(&commits);
        let tip = tips[keep.index(tips.len())].clone();

        let reachable = graph.reachable([&tip]);
        let removed = graph.prune_unreachable([&tip]);

        prop_assert_eq!(graph.len() + removed.len(), commits.len());
        prop_assert_eq!(graph.oids().cloned().collect::<HashSet<_>>(), reachable);
        graph.verify().unwrap();
    }

    /// Growing the reference set one cycle at a time lands on the same
    /// snapshot as building from scratch, and so does shrinking it again.
    #[test]
    fn incremental_updates_converge(commits in dag(), split in any::<prop::sample::Index>()) {
        let tips = heads(&commits);
        let split = split.index(tips.len() + 1);
        let backend = backend_with(&commits);
        let mut model = GraphModel::new(GraphOptions::default());

        for (i, tip) in tips.iter().enumerate().take(split) {
            backend.set_ref(branch(i), tip.clone());
        }
        backend.checkout(branch(0));
        update(&mut model, &backend);

        for (i, tip) in tips.iter().enumerate() {
            backend.set_ref(branch(i), tip.clone());
        }
        backend.checkout(branch(0));
        update(&mut model, &backend);

        let mut fresh = GraphModel::new(GraphOptions::default());
        update(&mut fresh, &backend);
        assert_same_layout(&model.snapshot(), &fresh.snapshot())?;
        prop_assert_eq!(model.snapshot().len(), commits.len());

        for i in 1..tips.len() {
            if i % 2 == 1 {
                backend.delete_ref(&branch(i));
            }
        }
        update(&mut model, &backend);

        let mut fresh = GraphModel::new(GraphOptions::default());
        update(&mut fresh, &backend);
        assert_same_layout(&model.snapshot(), &fresh.snapshot())?;
    }

    /// References landing on and leaving a stash's hidden parents, and the
    /// stash being dropped, keep incremental cycles equal to a fresh build.
    #[test]
    fn stash_parent_references_converge(commits in dag(), pick in any::<prop::sample::Index>()) {
        let tips = heads(&commits);
        let stash = commits[pick.index(commits.len())].clone();
        let backend = backend_with(&commits);
        let mut model = GraphModel::new(GraphOptions::default());

        for (i, tip) in tips.iter().enumerate() {
            backend.set_ref(branch(i), tip.clone());
        }
        backend.checkout(branch(0));
        backend.push_stash(stash.oid.clone());
        update(&mut model, &backend);

        let recover: Vec<RefName> = stash
            .parents
            .iter()
            .skip(1)
            .enumerate()
            .map(|(i, parent)| {
                let name = RefName::new(format!("refs/heads/recover{i}")).unwrap();
                backend.set_ref(name.clone(), parent.clone());
                name
            })
            .collect();
        update(&mut model, &backend);

        let mut fresh = GraphModel::new(GraphOptions::default());
        update(&mut fresh, &backend);
        assert_same_layout(&model.snapshot(), &fresh.snapshot())?;
        for parent in stash.parents.iter().skip(1) {
            prop_assert!(model.snapshot().position_of(parent).is_some());
        }

        for name in &recover {
            backend.delete_ref(name);
        }
        update(&mut model, &backend);

        let mut fresh = GraphModel::new(GraphOptions::default());
        update(&mut fresh, &backend);
        assert_same_layout(&model.snapshot(), &fresh.snapshot())?;

        backend.drop_stash(0);
        update(&mut model, &backend);

        let mut fresh = GraphModel::new(GraphOptions::default());
        update(&mut fresh, &backend);
        assert_same_layout(&model.snapshot(), &fresh.snapshot())?;
        prop_assert_eq!(model.snapshot().len(), commits.len());
    }
}
