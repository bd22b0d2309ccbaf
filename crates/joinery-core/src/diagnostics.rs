//! Duplicate diagnostics: explains row explosion before anyone merges
//!
//! Runs independently of any merge plan. For every column shared by two
//! or more datasets it counts duplicate key values, checks whether
//! trimming and lower-casing would reveal more duplicates, and simulates
//! the row count of each pairwise outer join so a bad join key is caught
//! up front instead of discovered in a 40x oversized output file.

use crate::error::Result;
use crate::loader;
use crate::schema::SchemaIndex;
use crate::table::{CellValue, Dataset, JoinKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How many sample values to record per (column, dataset)
const SAMPLE_LIMIT: usize = 3;

/// Full diagnostic report; read-only, never mutates the datasets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub generated_at: DateTime<Utc>,
    /// Datasets that were loaded for the analysis
    pub datasets: Vec<DatasetSummary>,
    /// Column names appearing in two or more datasets
    pub candidate_columns: Vec<String>,
    /// One entry per (candidate column, dataset containing it)
    pub column_reports: Vec<ColumnDatasetReport>,
    /// One entry per (candidate column, dataset pair containing it)
    pub pair_reports: Vec<PairReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub name: String,
    pub rows: usize,
}

/// Duplicate statistics for one column within one dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDatasetReport {
    pub column: String,
    pub dataset: String,
    pub rows: usize,
    /// Distinct non-null values
    pub distinct: usize,
    /// Non-null rows minus distinct values; nulls never count as
    /// duplicates of each other here
    pub duplicates: usize,
    /// Duplicates after trimming, lower-casing, and stringifying every
    /// cell (nulls stringify to "" and so do compare equal)
    pub normalized_duplicates: usize,
    /// Set when normalization uncovered duplicates the raw values hid
    pub case_whitespace_flag: bool,
    /// Display forms of the values that occur more than once
    pub duplicate_values: Vec<String>,
    /// First few values with their detected kinds
    pub samples: Vec<SampleValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleValue {
    pub value: String,
    pub kind: String,
}

/// Simulated pairwise outer join for one candidate column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairReport {
    pub column: String,
    pub left: String,
    pub right: String,
    pub left_rows: usize,
    pub right_rows: usize,
    /// Count of non-null values present on both sides
    pub common_values: usize,
    /// Predicted outer-join row count: a*b per common value, plus
    /// one-side counts, plus null-key rows from both sides
    pub simulated_rows: usize,
    /// Set when the simulated total exceeds both inputs; the key is not
    /// unique on at least one side
    pub explosion: bool,
    /// Per-value breakdown for values duplicated on either side, largest
    /// contribution first
    pub contributors: Vec<Contribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub value: String,
    pub left_count: usize,
    pub right_count: usize,
    pub rows: usize,
}

/// Run the diagnostics over the indexed files.
///
/// Only datasets carrying at least one candidate column are loaded, each
/// exactly once.
pub fn diagnose(index: &SchemaIndex) -> Result<DuplicateReport> {
    let candidates = candidate_columns(
        index
            .datasets
            .iter()
            .map(|d| d.column_names())
            .collect::<Vec<_>>(),
    );

    let mut datasets = Vec::new();
    for schema in &index.datasets {
        if schema
            .columns
            .iter()
            .any(|c| candidates.contains(&c.name))
        {
            datasets.push(loader::read_table(&schema.path)?);
        }
    }

    Ok(diagnose_datasets(&datasets))
}

/// Pure core of the diagnostics, over already-loaded datasets
pub fn diagnose_datasets(datasets: &[Dataset]) -> DuplicateReport {
    let mut sorted: Vec<&Dataset> = datasets.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let candidates =
        candidate_columns(sorted.iter().map(|d| d.column_names()).collect::<Vec<_>>());

    let mut column_reports = Vec::new();
    let mut pair_reports = Vec::new();

    for column in &candidates {
        let holders: Vec<(&Dataset, usize)> = sorted
            .iter()
            .filter_map(|d| d.column_index(column).map(|idx| (*d, idx)))
            .collect();

        for &(dataset, idx) in &holders {
            column_reports.push(column_report(column, dataset, idx));
        }
        for i in 0..holders.len() {
            for j in (i + 1)..holders.len() {
                pair_reports.push(pair_report(column, holders[i], holders[j]));
            }
        }
    }

    DuplicateReport {
        generated_at: Utc::now(),
        datasets: sorted
            .iter()
            .map(|d| DatasetSummary {
                name: d.name.clone(),
                rows: d.row_count(),
            })
            .collect(),
        candidate_columns: candidates.into_iter().collect(),
        column_reports,
        pair_reports,
    }
}

/// Column names present in at least two of the given column sets
fn candidate_columns(column_sets: Vec<BTreeSet<&str>>) -> BTreeSet<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for set in &column_sets {
        for name in set {
            *counts.entry(name).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

fn cell_at<'a>(row: &'a [CellValue], idx: usize) -> &'a CellValue {
    row.get(idx).unwrap_or(&CellValue::Empty)
}

/// Occurrences of each non-null key in one column
fn key_counts(dataset: &Dataset, idx: usize) -> BTreeMap<JoinKey, usize> {
    let mut counts = BTreeMap::new();
    for row in &dataset.rows {
        if let Some(key) = cell_at(row, idx).join_key() {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

fn column_report(column: &str, dataset: &Dataset, idx: usize) -> ColumnDatasetReport {
    let counts = key_counts(dataset, idx);
    let non_null: usize = counts.values().sum();
    let distinct = counts.len();
    let duplicates = non_null - distinct;

    let mut normalized: BTreeSet<String> = BTreeSet::new();
    for row in &dataset.rows {
        normalized.insert(cell_at(row, idx).normalized());
    }
    let normalized_duplicates = dataset.row_count() - normalized.len();

    let duplicate_values = counts
        .iter()
        .filter(|(_, &count)| count > 1)
        .map(|(key, _)| key.to_string())
        .collect();

    let samples = dataset
        .rows
        .iter()
        .take(SAMPLE_LIMIT)
        .map(|row| {
            let cell = cell_at(row, idx);
            SampleValue {
                value: cell.to_string_value(),
                kind: cell.kind_name().to_string(),
            }
        })
        .collect();

    ColumnDatasetReport {
        column: column.to_string(),
        dataset: dataset.name.clone(),
        rows: dataset.row_count(),
        distinct,
        duplicates,
        normalized_duplicates,
        case_whitespace_flag: normalized_duplicates > duplicates,
        duplicate_values,
        samples,
    }
}

fn pair_report(
    column: &str,
    (left, left_idx): (&Dataset, usize),
    (right, right_idx): (&Dataset, usize),
) -> PairReport {
    let left_counts = key_counts(left, left_idx);
    let right_counts = key_counts(right, right_idx);
    let left_nulls = left.row_count() - left_counts.values().sum::<usize>();
    let right_nulls = right.row_count() - right_counts.values().sum::<usize>();

    // Null-key rows never match, so each passes through on its own
    let mut simulated = left_nulls + right_nulls;
    let mut common_values = 0;
    let mut contributors = Vec::new();

    for (key, &a) in &left_counts {
        match right_counts.get(key) {
            Some(&b) => {
                common_values += 1;
                simulated += a * b;
                if a > 1 || b > 1 {
                    contributors.push(Contribution {
                        value: key.to_string(),
                        left_count: a,
                        right_count: b,
                        rows: a * b,
                    });
                }
            }
            None => simulated += a,
        }
    }
    for (key, &b) in &right_counts {
        if !left_counts.contains_key(key) {
            simulated += b;
        }
    }

    contributors.sort_by(|a, b| b.rows.cmp(&a.rows).then_with(|| a.value.cmp(&b.value)));

    PairReport {
        column: column.to_string(),
        left: left.name.clone(),
        right: right.name.clone(),
        left_rows: left.row_count(),
        right_rows: right.row_count(),
        common_values,
        simulated_rows: simulated,
        explosion: simulated > left.row_count() && simulated > right.row_count(),
        contributors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::read_table_str;

    fn dataset(name: &str, content: &str) -> Dataset {
        read_table_str(content, name).unwrap()
    }

    fn find_column<'a>(
        report: &'a DuplicateReport,
        column: &str,
        ds: &str,
    ) -> &'a ColumnDatasetReport {
        report
            .column_reports
            .iter()
            .find(|r| r.column == column && r.dataset == ds)
            .unwrap_or_else(|| panic!("no report for ({column}, {ds})"))
    }

    #[test]
    fn test_candidate_columns_need_two_datasets() {
        let report = diagnose_datasets(&[
            dataset("a", "id,name\n1,x\n"),
            dataset("b", "id,age\n1,2\n"),
        ]);
        assert_eq!(report.candidate_columns, vec!["id"]);
    }

    #[test]
    fn test_duplicate_counts() {
        let report = diagnose_datasets(&[
            dataset("a", "id\n1\n1\n2\n"),
            dataset("b", "id\n1\n2\n3\n"),
        ]);

        let a = find_column(&report, "id", "a");
        assert_eq!(a.rows, 3);
        assert_eq!(a.distinct, 2);
        assert_eq!(a.duplicates, 1);
        assert_eq!(a.duplicate_values, vec!["1"]);

        let b = find_column(&report, "id", "b");
        assert_eq!(b.duplicates, 0);
        assert!(b.duplicate_values.is_empty());
    }

    #[test]
    fn test_nulls_are_not_raw_duplicates() {
        let report = diagnose_datasets(&[
            dataset("a", "id,x\n,1\n,2\n5,3\n"),
            dataset("b", "id\n5\n"),
        ]);
        let a = find_column(&report, "id", "a");
        // Two nulls: zero raw duplicates, but they normalize to the same
        // empty string and trip the flag
        assert_eq!(a.duplicates, 0);
        assert_eq!(a.normalized_duplicates, 1);
        assert!(a.case_whitespace_flag);
    }

    #[test]
    fn test_case_whitespace_flag() {
        let report = diagnose_datasets(&[
            dataset("a", "key\nA\na \n"),
            dataset("b", "key\na\n"),
        ]);

        let a = find_column(&report, "key", "a");
        assert_eq!(a.duplicates, 0);
        assert_eq!(a.normalized_duplicates, 1);
        assert!(a.case_whitespace_flag);

        let b = find_column(&report, "key", "b");
        assert!(!b.case_whitespace_flag);
    }

    #[test]
    fn test_pair_simulation_and_explosion() {
        // Scenario: left id=[1,1,2], right id=[1,2,2]
        let report = diagnose_datasets(&[
            dataset("left", "id\n1\n1\n2\n"),
            dataset("right", "id\n1\n2\n2\n"),
        ]);

        assert_eq!(report.pair_reports.len(), 1);
        let pair = &report.pair_reports[0];
        assert_eq!(pair.common_values, 2);
        // 2x1 for id=1 plus 1x2 for id=2
        assert_eq!(pair.simulated_rows, 4);
        assert!(pair.explosion);

        assert_eq!(pair.contributors.len(), 2);
        assert_eq!(pair.contributors[0].rows, 2);
        assert_eq!(pair.contributors[1].rows, 2);
        assert_eq!(pair.contributors[0].value, "1");
        assert_eq!(pair.contributors[0].left_count, 2);
        assert_eq!(pair.contributors[0].right_count, 1);
    }

    #[test]
    fn test_unique_keys_do_not_explode() {
        let report = diagnose_datasets(&[
            dataset("left", "id\n1\n2\n3\n"),
            dataset("right", "id\n2\n3\n4\n"),
        ]);
        let pair = &report.pair_reports[0];
        // 2 matches plus one unmatched per side
        assert_eq!(pair.simulated_rows, 4);
        assert_eq!(pair.common_values, 2);
        assert!(pair.contributors.is_empty());
    }

    #[test]
    fn test_simulation_counts_null_rows_separately() {
        let report = diagnose_datasets(&[
            dataset("left", "id\n1\n\n"),
            dataset("right", "id\n1\n\n"),
        ]);
        let pair = &report.pair_reports[0];
        // One matched pair plus a pass-through null row from each side
        assert_eq!(pair.simulated_rows, 3);
    }

    #[test]
    fn test_samples_record_kinds() {
        let report = diagnose_datasets(&[
            dataset("a", "id\n1\nx\n2.5\n9\n"),
            dataset("b", "id\n1\n"),
        ]);
        let a = find_column(&report, "id", "a");
        assert_eq!(a.samples.len(), 3);
        assert_eq!(a.samples[0].kind, "integer");
        assert_eq!(a.samples[1].kind, "text");
        assert_eq!(a.samples[2].kind, "float");
    }

    #[test]
    fn test_simulation_matches_executor_on_trailing_rows() {
        // Parser pads a short CSV row with a null, which must count as a
        // null key here exactly like the executor treats it
        let report = diagnose_datasets(&[
            dataset("a", "id,x\n1,q\n"),
            dataset("b", "x,id\nq,1\nw\n"),
        ]);
        let pair = report
            .pair_reports
            .iter()
            .find(|p| p.column == "id")
            .unwrap();
        // id=1 matches 1x1; b's padded row has a null id and passes through
        assert_eq!(pair.simulated_rows, 2);
    }
}
