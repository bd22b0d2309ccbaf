//! Structured analysis report, the single source for text and JSON output

use crate::graph::{ConnectivityGraph, Edge};
use crate::planner::{MergePlan, PlanOutcome};
use crate::schema::{LoadFailure, SchemaIndex};
use crate::table::DatasetSchema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything the analyze step learned about a dataset collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    /// Directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Indexed datasets (header-level)
    pub datasets: Vec<DatasetSchema>,
    /// Files that could not be indexed
    pub skipped: Vec<LoadFailure>,
    /// Shared-column relationships
    pub connections: Vec<Edge>,
    /// Datasets with no shared columns at all
    pub isolated: Vec<String>,
    /// Distinct column names across all datasets
    pub total_columns: usize,
    /// Whether a single join sequence can unify everything
    pub mergeable: bool,
    /// Mutually unmergeable groups; empty when mergeable
    pub groups: Vec<Vec<String>>,
    /// The executable join sequence; None when disconnected
    pub plan: Option<MergePlan>,
}

impl AnalysisReport {
    /// Assemble the report from the analysis stages' outputs
    pub fn build(
        roots: &[PathBuf],
        index: &SchemaIndex,
        skipped: &[LoadFailure],
        graph: &ConnectivityGraph,
        outcome: &PlanOutcome,
    ) -> Self {
        let (mergeable, groups, plan) = match outcome {
            PlanOutcome::Mergeable(plan) => (true, Vec::new(), Some(plan.clone())),
            PlanOutcome::Disconnected { groups } => (false, groups.clone(), None),
        };

        AnalysisReport {
            generated_at: Utc::now(),
            roots: roots.to_vec(),
            datasets: index.datasets.clone(),
            skipped: skipped.to_vec(),
            connections: graph.edges.clone(),
            isolated: graph.isolated().iter().map(|s| s.to_string()).collect(),
            total_columns: index.distinct_column_count(),
            mergeable,
            groups,
            plan,
        }
    }
}
