//! Error types for joinery-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in joinery-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No encoding in the fallback chain could decode the file
    #[error("failed to decode '{path}': no encoding in the fallback chain succeeded (first invalid byte at offset {offset}, line {line}, column {column})")]
    Decode {
        path: PathBuf,
        offset: usize,
        line: usize,
        column: usize,
    },

    /// Failed to parse CSV
    #[error("failed to parse CSV '{path}': {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// No CSV files were discovered under the given roots
    #[error("no CSV files found under the given roots")]
    NoInput,

    /// A dataset referenced by a plan is not in the index
    #[error("dataset '{0}' not found in the schema index")]
    DatasetNotFound(String),

    /// A join column vanished from a dataset between indexing and loading
    #[error("join column '{column}' missing from dataset '{dataset}' (file changed on disk?)")]
    MissingColumn { column: String, dataset: String },

    /// A merge plan violated its own ordering invariant; this is a planner
    /// bug, not a data problem
    #[error("merge plan invariant violated: {0}")]
    PlanInvariant(String),

    /// Datasets failed to load in a mode that requires all of them
    #[error("{0} dataset(s) failed to load; aborting")]
    LoadFailures(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
