//! SchemaIndex: header-level registry of every discoverable dataset

use crate::loader;
use crate::table::DatasetSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A file that could not be indexed, and why
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadFailure {
    /// The offending file
    pub path: PathBuf,
    /// Human-readable detection reason
    pub reason: String,
}

/// Header-level index over a collection of dataset files.
///
/// Holds ordered column lists only; row data is never touched here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaIndex {
    /// Indexed datasets, in discovery (path-sorted) order
    pub datasets: Vec<DatasetSchema>,
}

impl SchemaIndex {
    /// Index the headers of the given files.
    ///
    /// Files whose header cannot be decoded or parsed land in the failure
    /// list instead of the index; the caller decides whether that is a
    /// warning or a fatal condition. Two files with the same stem would
    /// collide on identity, so the first wins and the second is reported
    /// as a failure.
    pub fn build(paths: &[PathBuf]) -> (SchemaIndex, Vec<LoadFailure>) {
        let mut datasets: Vec<DatasetSchema> = Vec::new();
        let mut failures = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();

        for path in paths {
            match loader::read_schema(path) {
                Ok(schema) => {
                    if seen.contains(&schema.name) {
                        failures.push(LoadFailure {
                            path: path.clone(),
                            reason: format!(
                                "duplicate dataset name '{}' (first file wins)",
                                schema.name
                            ),
                        });
                        continue;
                    }
                    seen.insert(schema.name.clone());
                    datasets.push(schema);
                }
                Err(e) => failures.push(LoadFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        (SchemaIndex { datasets }, failures)
    }

    /// Find a dataset's schema by name
    pub fn find(&self, name: &str) -> Option<&DatasetSchema> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Number of indexed datasets
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Count of distinct column names across all datasets
    pub fn distinct_column_count(&self) -> usize {
        let mut all: BTreeSet<&str> = BTreeSet::new();
        for ds in &self.datasets {
            all.extend(ds.column_names());
        }
        all.len()
    }
}
