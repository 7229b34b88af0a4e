//! Per-table summary statistics

use crate::table::{CellValue, Table};
use serde::Serialize;
use std::fmt;

/// Inferred kind of a column's non-missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Date,
    Mixed,
    Empty,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Text => "text",
            ColumnKind::Date => "date",
            ColumnKind::Mixed => "mixed",
            ColumnKind::Empty => "empty",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub kind: ColumnKind,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    pub source: String,
    pub rows: usize,
    pub columns: usize,
    pub column_stats: Vec<ColumnStats>,
}

impl TableStats {
    /// Missing cells across all columns
    pub fn total_missing(&self) -> usize {
        self.column_stats.iter().map(|c| c.missing).sum()
    }
}

/// Summarise a table: size, and per column its kind and missing count
pub fn table_stats(table: &Table) -> TableStats {
    let column_stats = table
        .columns
        .iter()
        .map(|col| {
            let mut kind = ColumnKind::Empty;
            let mut missing = 0;
            for cell in table.column_values(col.index) {
                let this = match cell {
                    CellValue::Missing => {
                        missing += 1;
                        continue;
                    }
                    CellValue::Integer(_) => ColumnKind::Integer,
                    CellValue::Float(_) => ColumnKind::Float,
                    CellValue::String(_) => ColumnKind::Text,
                    CellValue::Date(_) => ColumnKind::Date,
                };
                kind = widen(kind, this);
            }
            ColumnStats {
                name: col.name.clone(),
                kind,
                missing,
            }
        })
        .collect();

    TableStats {
        source: table.label(),
        rows: table.row_count(),
        columns: table.column_count(),
        column_stats,
    }
}

fn widen(current: ColumnKind, next: ColumnKind) -> ColumnKind {
    use ColumnKind::*;
    match (current, next) {
        (Empty, k) => k,
        (a, b) if a == b => a,
        (Integer, Float) | (Float, Integer) => Float,
        _ => Mixed,
    }
}
