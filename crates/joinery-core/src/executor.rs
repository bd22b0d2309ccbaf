//! Merge execution: sequential collision-safe full outer joins

use crate::error::{Error, Result};
use crate::loader;
use crate::planner::{MergePlan, MergeStep};
use crate::schema::SchemaIndex;
use crate::table::{CellValue, Column, Dataset, JoinKey};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// The unified table produced by executing a merge plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedTable {
    /// Union of all input columns, first-seen order, left wins on name
    /// collisions
    pub columns: Vec<Column>,
    /// Joined rows
    pub rows: Vec<Vec<CellValue>>,
    /// Dataset names in merge order
    pub sources: Vec<String>,
    /// Total rows across all inputs, for explosion reporting
    pub input_rows: usize,
}

impl MergedTable {
    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Write the table as CSV: union header, quoted where needed,
    /// trailing newline
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> Result<()> {
        let header: Vec<String> = self
            .columns
            .iter()
            .map(|c| escape_csv(&c.name))
            .collect();
        writeln!(writer, "{}", header.join(","))?;

        for row in &self.rows {
            let values: Vec<String> = row
                .iter()
                .map(|cell| escape_csv(&cell.to_string_value()))
                .collect();
            writeln!(writer, "{}", values.join(","))?;
        }

        Ok(())
    }

    /// Write the table as CSV to a file
    pub fn write_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write_csv(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Execute a merge plan against the indexed files.
///
/// The accumulated table is seeded with the root dataset; each step then
/// loads its incoming dataset (each file is read exactly once across the
/// run) and outer-joins it in.
pub fn execute_plan(plan: &MergePlan, index: &SchemaIndex) -> Result<MergedTable> {
    let root = index
        .find(&plan.root)
        .ok_or_else(|| Error::DatasetNotFound(plan.root.clone()))?;
    let seed = loader::read_table(&root.path)?;

    let mut columns = seed.columns;
    let mut rows = seed.rows;
    let mut input_rows = rows.len();
    let mut sources = vec![seed.name];

    for step in &plan.steps {
        let schema = index
            .find(&step.incoming)
            .ok_or_else(|| Error::DatasetNotFound(step.incoming.clone()))?;
        let right = loader::read_table(&schema.path)?;
        input_rows += right.row_count();
        join_step(&mut columns, &mut rows, &right, step)?;
        sources.push(right.name);
    }

    Ok(MergedTable {
        columns,
        rows,
        sources,
        input_rows,
    })
}

/// Outer-join one incoming dataset into the accumulated table.
///
/// Collision policy: a right-side column whose name already exists on
/// the left and is not a join key is dropped before joining; the left's
/// values win. Join-key columns appear exactly once, unsuffixed. Rows
/// with a null value in any key cell never match and pass through
/// unmatched.
fn join_step(
    columns: &mut Vec<Column>,
    rows: &mut Vec<Vec<CellValue>>,
    right: &Dataset,
    step: &MergeStep,
) -> Result<()> {
    if step.on.is_empty() {
        return Err(Error::PlanInvariant(format!(
            "empty join-column set for step merging '{}'",
            right.name
        )));
    }

    // A key column missing on the accumulated side means the planner
    // produced a bad step; missing on the right side means the file
    // changed between indexing and loading.
    let left_key_idx: Vec<usize> = step
        .on
        .iter()
        .map(|name| {
            columns
                .iter()
                .position(|c| c.name == *name)
                .ok_or_else(|| {
                    Error::PlanInvariant(format!(
                        "join column '{}' missing from accumulated table before merging '{}'",
                        name, right.name
                    ))
                })
        })
        .collect::<Result<_>>()?;
    let right_key_idx: Vec<usize> = step
        .on
        .iter()
        .map(|name| {
            right.column_index(name).ok_or_else(|| Error::MissingColumn {
                column: name.clone(),
                dataset: right.name.clone(),
            })
        })
        .collect::<Result<_>>()?;

    // Right columns that survive: only names the left does not have yet.
    // Key columns collide by definition and are taken from the left.
    let left_names: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    let kept_right: Vec<usize> = right
        .columns
        .iter()
        .filter(|c| !left_names.contains(c.name.as_str()))
        .map(|c| c.index)
        .collect();

    let old_width = columns.len();
    for &idx in &kept_right {
        let name = right.columns[idx].name.clone();
        let position = columns.len();
        columns.push(Column::new(name, position));
    }

    // Hash join: build on the right, probe with the left. Row indices
    // per key keep the right dataset's file order.
    let mut by_key: HashMap<Vec<JoinKey>, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows.iter().enumerate() {
        if let Some(key) = row_key(row, &right_key_idx) {
            by_key.entry(key).or_default().push(i);
        }
    }

    let mut matched = vec![false; right.rows.len()];
    let mut joined: Vec<Vec<CellValue>> = Vec::with_capacity(rows.len());

    for left_row in rows.drain(..) {
        let key = row_key(&left_row, &left_key_idx);
        match key.and_then(|k| by_key.get(&k)) {
            Some(hits) => {
                for &ri in hits {
                    matched[ri] = true;
                    let mut row = left_row.clone();
                    for &ci in &kept_right {
                        row.push(right.rows[ri][ci].clone());
                    }
                    joined.push(row);
                }
            }
            None => {
                let mut row = left_row;
                row.resize(columns.len(), CellValue::Empty);
                joined.push(row);
            }
        }
    }

    // Unmatched right rows, in file order: nulls on the left side except
    // the key columns, which carry the right row's own key values
    for (ri, right_row) in right.rows.iter().enumerate() {
        if matched[ri] {
            continue;
        }
        let mut row = vec![CellValue::Empty; old_width];
        for (k, &ci) in right_key_idx.iter().enumerate() {
            row[left_key_idx[k]] = right_row[ci].clone();
        }
        for &ci in &kept_right {
            row.push(right_row[ci].clone());
        }
        joined.push(row);
    }

    *rows = joined;
    Ok(())
}

fn row_key(cells: &[CellValue], indices: &[usize]) -> Option<Vec<JoinKey>> {
    indices
        .iter()
        .map(|&i| cells.get(i).and_then(CellValue::join_key))
        .collect()
}

/// Escape a value for CSV output
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
