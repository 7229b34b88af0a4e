//! Core table types for representing delimited tabular data

use crate::error::{Error, Result};
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Field values that loaders treat as missing data
const MISSING_MARKERS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "#N/A", "<NA>",
];

/// A table loaded from a single file, or produced by a pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row data
    pub rows: Vec<Row>,
    /// Source file path, used as the table's identity
    pub source_path: PathBuf,
}

impl Table {
    /// Create a new empty table
    pub fn new(source_path: PathBuf) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            source_path,
        }
    }

    /// Build a table from column names and row cells, assigning column indices
    pub fn from_parts<I, S>(source_path: impl Into<PathBuf>, names: I, rows: Vec<Vec<CellValue>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Column::new(name.into(), i))
            .collect();

        Self {
            columns,
            rows: rows.into_iter().map(Row::new).collect(),
            source_path: source_path.into(),
        }
    }

    /// Copy of this table's columns and identity with a different row set
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
            source_path: self.source_path.clone(),
        }
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Position of the first column with this name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Iterate over the cells of one column
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().map(move |r| r.get(index).unwrap_or(&CellValue::Missing))
    }

    /// Short display name: the file name when there is one
    pub fn label(&self) -> String {
        display_name(&self.source_path)
    }

    /// Check that every row has one cell per column
    pub fn validate(&self) -> Result<()> {
        let expected = self.columns.len();
        for (i, row) in self.rows.iter().enumerate() {
            if row.cells.len() != expected {
                return Err(Error::RaggedRow {
                    row: i,
                    expected,
                    found: row.cells.len(),
                });
            }
        }
        Ok(())
    }

    /// New table holding only the columns at `indices`, in that order
    pub fn select_indices(&self, indices: &[usize]) -> Self {
        let columns = indices
            .iter()
            .enumerate()
            .filter_map(|(i, &idx)| {
                self.columns
                    .get(idx)
                    .map(|c| Column::new(c.name.clone(), i))
            })
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|r| {
                Row::new(
                    indices
                        .iter()
                        .map(|&idx| r.get(idx).cloned().unwrap_or(CellValue::Missing))
                        .collect(),
                )
            })
            .collect();

        Self {
            columns,
            rows,
            source_path: self.source_path.clone(),
        }
    }
}

/// File name of a path, falling back to the full display form
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as it appears in the header
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

/// A row of data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values for each column
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    /// True when any cell is missing
    pub fn has_missing(&self) -> bool {
        self.cells.iter().any(CellValue::is_missing)
    }

    /// Hashable identity of the whole row, used for duplicate detection
    pub(crate) fn key(&self) -> Vec<CellKey> {
        self.cells.iter().map(CellValue::key).collect()
    }
}

/// A cell value with type detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
    /// Date/time value
    Date(NaiveDateTime),
    /// Missing data
    Missing,
}

impl CellValue {
    /// Parse a string into a CellValue, detecting the type
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed) {
            return CellValue::Missing;
        }

        // Try parsing as integer first
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        // Try parsing as float
        if let Ok(f) = trimmed.parse::<f64>() {
            return CellValue::Float(f);
        }

        // Otherwise, keep as string
        CellValue::String(trimmed.to_string())
    }

    /// Check if the cell is missing
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// True for integer and float cells
    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Integer(_) | CellValue::Float(_))
    }

    /// Numeric view of the cell, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        match self {
            CellValue::Missing => String::new(),
            other => other.to_string(),
        }
    }

    pub(crate) fn key(&self) -> CellKey {
        match self {
            CellValue::Integer(i) => CellKey::Integer(*i),
            CellValue::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    CellKey::Integer(*f as i64)
                } else if f.is_nan() {
                    CellKey::Missing
                } else {
                    CellKey::Float(f.to_bits())
                }
            }
            CellValue::String(s) => CellKey::String(s.clone()),
            CellValue::Date(d) => CellKey::Date(*d),
            CellValue::Missing => CellKey::Missing,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Date(d) if d.num_seconds_from_midnight() == 0 && d.nanosecond() == 0 => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Missing => write!(f, ""),
        }
    }
}

/// Hashable form of a cell; integral floats collapse onto integers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CellKey {
    Integer(i64),
    Float(u64),
    String(String),
    Date(NaiveDateTime),
    Missing,
}
