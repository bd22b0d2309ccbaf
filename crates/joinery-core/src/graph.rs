//! Connectivity graph over datasets linked by shared column names

use crate::schema::SchemaIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// An unordered dataset pair and the exact set of columns both carry.
///
/// Canonical form: `left` sorts before `right`, `shared` is sorted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub left: String,
    pub right: String,
    pub shared: Vec<String>,
}

/// Datasets as nodes, shared-column relationships as edges.
///
/// Isolated datasets stay in `nodes` with no incident edge. There is at
/// most one edge per pair, carrying the full column intersection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityGraph {
    /// Dataset names, sorted
    pub nodes: Vec<String>,
    /// One edge per pair with a non-empty column intersection
    pub edges: Vec<Edge>,
}

impl ConnectivityGraph {
    /// Build the graph from a schema index with O(D^2) pairwise
    /// intersection tests. D is tens at most, so this is fine.
    pub fn build(index: &SchemaIndex) -> Self {
        let mut schemas: Vec<_> = index.datasets.iter().collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));

        let mut edges = Vec::new();
        for i in 0..schemas.len() {
            let cols_a = schemas[i].column_names();
            for j in (i + 1)..schemas.len() {
                let cols_b = schemas[j].column_names();
                let shared: Vec<String> = cols_a
                    .intersection(&cols_b)
                    .map(|s| s.to_string())
                    .collect();
                if !shared.is_empty() {
                    edges.push(Edge {
                        left: schemas[i].name.clone(),
                        right: schemas[j].name.clone(),
                        shared,
                    });
                }
            }
        }

        ConnectivityGraph {
            nodes: schemas.iter().map(|s| s.name.clone()).collect(),
            edges,
        }
    }

    fn adjacency(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut adj: BTreeMap<&str, BTreeSet<&str>> = self
            .nodes
            .iter()
            .map(|n| (n.as_str(), BTreeSet::new()))
            .collect();
        for e in &self.edges {
            adj.entry(e.left.as_str()).or_default().insert(&e.right);
            adj.entry(e.right.as_str()).or_default().insert(&e.left);
        }
        adj
    }

    /// Connected components via breadth-first search, each sorted, in
    /// order of their lexically smallest member.
    pub fn components(&self) -> Vec<Vec<String>> {
        let adj = self.adjacency();
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut groups = Vec::new();

        for node in &self.nodes {
            if visited.contains(node.as_str()) {
                continue;
            }
            visited.insert(node.as_str());
            let mut group = Vec::new();
            let mut queue: VecDeque<&str> = VecDeque::from([node.as_str()]);
            while let Some(current) = queue.pop_front() {
                group.push(current.to_string());
                if let Some(neighbors) = adj.get(current) {
                    for &n in neighbors {
                        if visited.insert(n) {
                            queue.push_back(n);
                        }
                    }
                }
            }
            group.sort();
            groups.push(group);
        }

        groups
    }

    /// Whether every dataset is reachable from every other
    pub fn is_connected(&self) -> bool {
        self.components().len() <= 1
    }

    /// Number of edges incident to a dataset
    pub fn degree(&self, name: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.left == name || e.right == name)
            .count()
    }

    /// Datasets with no shared columns at all
    pub fn isolated(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .map(|n| n.as_str())
            .filter(|n| self.degree(n) == 0)
            .collect()
    }
}
