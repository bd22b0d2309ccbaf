//! Merge planning: connectivity check, spanning tree, execution order
//!
//! A spanning tree's edge set alone is not an executable plan; edges have
//! to be ordered so each one attaches a brand-new dataset to the already
//! merged side. The planner makes that ordering explicit with a
//! breadth-first walk of the tree instead of trusting edge iteration
//! order.

use crate::graph::{ConnectivityGraph, Edge};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// One pairwise join: the already-merged side, the dataset it pulls in,
/// and the columns to join on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeStep {
    /// Tree neighbor that is already part of the accumulated table
    pub base: String,
    /// Dataset this step introduces
    pub incoming: String,
    /// Join columns, the full shared set of the tree edge
    pub on: Vec<String>,
}

/// An ordered, executable sequence of joins covering one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePlan {
    /// Dataset the accumulated table is seeded with
    pub root: String,
    /// Steps in execution order; length = component size - 1
    pub steps: Vec<MergeStep>,
}

/// Planning result. A disconnected graph is a normal outcome, not an
/// error: the groups explain exactly which datasets cannot reach each
/// other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlanOutcome {
    Mergeable(MergePlan),
    Disconnected { groups: Vec<Vec<String>> },
}

/// Derive a merge plan from the connectivity graph.
///
/// Spanning-tree selection is deterministic: edges are taken in order of
/// largest shared-column set first, ties broken by lexical (left, right)
/// dataset names. The root is the lexically smallest dataset and tree
/// neighbors are visited in name order, so the same inputs always
/// produce the same plan.
pub fn plan_merge(graph: &ConnectivityGraph) -> PlanOutcome {
    let components = graph.components();
    if components.len() > 1 {
        return PlanOutcome::Disconnected { groups: components };
    }
    let Some(root) = graph.nodes.first().cloned() else {
        return PlanOutcome::Disconnected { groups: Vec::new() };
    };

    // Kruskal over the documented edge order
    let mut candidates: Vec<&Edge> = graph.edges.iter().collect();
    candidates.sort_by(|a, b| {
        b.shared
            .len()
            .cmp(&a.shared.len())
            .then_with(|| a.left.cmp(&b.left))
            .then_with(|| a.right.cmp(&b.right))
    });

    let mut forest = UnionFind::new(&graph.nodes);
    let mut tree: Vec<&Edge> = Vec::new();
    for edge in candidates {
        if forest.union(&edge.left, &edge.right) {
            tree.push(edge);
        }
    }

    // Breadth-first walk of the tree from the root; every popped node is
    // already merged, so attaching an unvisited neighbor is always valid.
    let mut adjacency: BTreeMap<&str, Vec<(&str, &Edge)>> = BTreeMap::new();
    for &edge in &tree {
        adjacency
            .entry(edge.left.as_str())
            .or_default()
            .push((edge.right.as_str(), edge));
        adjacency
            .entry(edge.right.as_str())
            .or_default()
            .push((edge.left.as_str(), edge));
    }
    for neighbors in adjacency.values_mut() {
        neighbors.sort_by(|a, b| a.0.cmp(b.0));
    }

    let mut steps = Vec::new();
    let mut visited: BTreeSet<&str> = BTreeSet::from([root.as_str()]);
    let mut queue: VecDeque<&str> = VecDeque::from([root.as_str()]);
    while let Some(current) = queue.pop_front() {
        if let Some(neighbors) = adjacency.get(current) {
            for &(neighbor, edge) in neighbors {
                if visited.insert(neighbor) {
                    steps.push(MergeStep {
                        base: current.to_string(),
                        incoming: neighbor.to_string(),
                        on: edge.shared.clone(),
                    });
                    queue.push_back(neighbor);
                }
            }
        }
    }

    PlanOutcome::Mergeable(MergePlan { root, steps })
}

/// Union-find with path halving, keyed by dataset name
struct UnionFind {
    index: BTreeMap<String, usize>,
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(nodes: &[String]) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self {
            index,
            parent: (0..nodes.len()).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Returns true if the two names were in different sets
    fn union(&mut self, a: &str, b: &str) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(a), self.index.get(b)) else {
            return false;
        };
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        self.parent[rb] = ra;
        true
    }
}
