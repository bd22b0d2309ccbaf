//! joinery-core: Core library for analyzing and merging column-linked CSV datasets
//!
//! This library provides functionality to:
//! - Discover CSV files and index their headers without loading row data
//! - Build a connectivity graph of datasets linked by shared column names
//! - Plan a deterministic, executable sequence of pairwise outer joins
//! - Execute the plan into one unified table with collision-safe columns
//! - Diagnose row-count explosion caused by duplicate join-key values

pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod graph;
pub mod loader;
pub mod planner;
pub mod report;
pub mod scanner;
pub mod schema;
pub mod table;

pub use diagnostics::{diagnose, diagnose_datasets, DuplicateReport};
pub use error::{Error, Result};
pub use executor::{execute_plan, MergedTable};
pub use graph::{ConnectivityGraph, Edge};
pub use loader::{read_schema, read_table, read_table_str};
pub use planner::{plan_merge, MergePlan, MergeStep, PlanOutcome};
pub use report::AnalysisReport;
pub use scanner::discover_files;
pub use schema::{LoadFailure, SchemaIndex};
pub use table::{CellValue, Column, Dataset, DatasetSchema, JoinKey};
