//! Core value and dataset types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A cell value with type detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// Text value, raw spelling preserved
    Text(String),
    /// Empty/null cell
    Empty,
}

impl CellValue {
    /// Parse a string into a CellValue, detecting the type.
    ///
    /// Detection runs on the trimmed token, but text keeps its raw
    /// untrimmed spelling so whitespace inconsistencies stay observable
    /// for the normalization check.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            return CellValue::Float(f);
        }

        CellValue::Text(s.to_string())
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Hashable join identity, or None for a null cell.
    ///
    /// Equality is per kind: `Integer(1)` and `Float(1.0)` are distinct
    /// keys, and a null cell never matches anything, itself included.
    pub fn join_key(&self) -> Option<JoinKey> {
        match self {
            CellValue::Integer(i) => Some(JoinKey::Integer(*i)),
            CellValue::Float(f) => Some(JoinKey::Float(f.to_bits())),
            CellValue::Text(s) => Some(JoinKey::Text(s.clone())),
            CellValue::Empty => None,
        }
    }

    /// Normalized form for the case/whitespace check: display string,
    /// trimmed and lower-cased. Null normalizes to "".
    pub fn normalized(&self) -> String {
        self.to_string_value().trim().to_lowercase()
    }

    /// Kind label used in diagnostic samples
    pub fn kind_name(&self) -> &'static str {
        match self {
            CellValue::Integer(_) => "integer",
            CellValue::Float(_) => "float",
            CellValue::Text(_) => "text",
            CellValue::Empty => "null",
        }
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        match self {
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Empty => write!(f, ""),
        }
    }
}

/// Join identity of a non-null cell. Floats key by bit pattern so the
/// type is Eq + Hash + Ord.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JoinKey {
    Integer(i64),
    Float(u64),
    Text(String),
}

impl std::fmt::Display for JoinKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinKey::Integer(i) => write!(f, "{}", i),
            JoinKey::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            JoinKey::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name as spelled in the header
    pub name: String,
    /// Column index (0-based)
    pub index: usize,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, index: usize) -> Self {
        Self { name, index }
    }
}

/// Header-level view of a dataset: identity plus ordered columns, no rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Dataset identity (file stem)
    pub name: String,
    /// Source file path
    pub path: PathBuf,
    /// Ordered column definitions
    pub columns: Vec<Column>,
    /// Encoding the header decoded with
    pub encoding: String,
}

impl DatasetSchema {
    /// Column names as a set
    pub fn column_names(&self) -> BTreeSet<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// A fully loaded dataset: schema plus typed rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset identity (file stem)
    pub name: String,
    /// Source file path
    pub path: PathBuf,
    /// Ordered column definitions
    pub columns: Vec<Column>,
    /// Row data; every row is padded to the column count
    pub rows: Vec<Vec<CellValue>>,
    /// Encoding the file decoded with
    pub encoding: String,
}

impl Dataset {
    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column's index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column names as a set
    pub fn column_names(&self) -> BTreeSet<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
