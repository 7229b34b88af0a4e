//! Column-name reconciliation across and within tables
//!
//! Two paths exist and they are intentionally different:
//!
//! - [`reconcile_for_stacking`] runs before tables are concatenated. A name
//!   shared by several inputs is not presumed to mean the same thing, so every
//!   table after the first one carrying it gets `"{name}_{table_index}"`.
//! - [`resolve_duplicate_columns`] runs on a joined table whose column list
//!   contains exact duplicates and applies a [`DuplicateColumnStrategy`].

use crate::config::DuplicateColumnStrategy;
use crate::error::{Error, Result};
use crate::report::MergeLog;
use crate::table::{CellValue, Column, Row, Table};
use std::collections::{HashMap, HashSet};

/// Separator used when folding duplicate columns together
pub const MERGE_SEPARATOR: &str = " | ";

/// True when a column name looks like it holds dates or times
pub fn is_date_like(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("date") || lower.contains("time")
}

/// Names of date-like columns, in column order
pub fn detect_date_columns(columns: &[Column]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| is_date_like(&c.name))
        .map(|c| c.name.clone())
        .collect()
}

/// Names that occur more than once in a column list, in order of first appearance
pub fn duplicate_names(columns: &[Column]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for col in columns {
        *counts.entry(col.name.as_str()).or_default() += 1;
    }

    let mut seen = HashSet::new();
    columns
        .iter()
        .filter(|c| counts[c.name.as_str()] > 1 && seen.insert(c.name.as_str()))
        .map(|c| c.name.clone())
        .collect()
}

/// Rename columns shared between input tables so stacking keeps them apart
///
/// The first table carrying a name keeps it; each later table carrying it
/// renames it to `"{name}_{i}"` where `i` is that table's position. A
/// generated name that is already taken gets a further `_1`, `_2`, ...
pub fn reconcile_for_stacking(tables: &[Table], log: &mut MergeLog) -> Vec<Table> {
    let mut owners: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for (i, table) in tables.iter().enumerate() {
        let mut in_table = HashSet::new();
        for col in &table.columns {
            if !in_table.insert(col.name.as_str()) {
                continue;
            }
            let entry = owners.entry(col.name.as_str()).or_default();
            if entry.is_empty() {
                order.push(col.name.as_str());
            }
            entry.push(i);
        }
    }

    let shared: Vec<&str> = order
        .into_iter()
        .filter(|name| owners[name].len() > 1)
        .collect();

    if shared.is_empty() {
        return tables.to_vec();
    }

    log.info(format!(
        "Duplicate column names across inputs: {}",
        shared.join(", ")
    ));

    let mut used: HashSet<String> = tables
        .iter()
        .flat_map(|t| t.columns.iter().map(|c| c.name.clone()))
        .collect();
    let mut renamed = tables.to_vec();
    for name in &shared {
        let mut new_names = Vec::new();
        for &i in owners[name].iter().skip(1) {
            let new_name = claim_name(format!("{}_{}", name, i), &mut used);
            for col in renamed[i].columns.iter_mut().filter(|c| c.name == *name) {
                col.name = new_name.clone();
            }
            new_names.push(new_name);
        }
        log.info(format!("Renamed '{}' in later inputs to {}", name, new_names.join(", ")));
    }

    renamed
}

/// Make column names unique in a combined table according to `strategy`
///
/// A group that cannot be resolved is logged and left as it was; the other
/// groups are still processed.
pub fn resolve_duplicate_columns(
    table: &Table,
    strategy: DuplicateColumnStrategy,
    log: &mut MergeLog,
) -> Table {
    let dup_names = duplicate_names(&table.columns);
    if dup_names.is_empty() {
        return table.clone();
    }

    log.info(format!(
        "Duplicate columns detected: {} (strategy={})",
        dup_names.join(", "),
        strategy
    ));

    match strategy {
        DuplicateColumnStrategy::KeepAll => rename_occurrences(table, &dup_names, log),
        DuplicateColumnStrategy::First | DuplicateColumnStrategy::Last => {
            keep_one_occurrence(table, &dup_names, strategy, log)
        }
        DuplicateColumnStrategy::Merge => merge_occurrences(table, &dup_names, log),
    }
}

fn positions_of(columns: &[Column], name: &str) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.name == name)
        .map(|(i, _)| i)
        .collect()
}

/// Reserve `candidate`, or the first free `"{candidate}_{n}"` when it is taken
fn claim_name(candidate: String, used: &mut HashSet<String>) -> String {
    let mut name = candidate.clone();
    let mut n = 0;
    while used.contains(&name) {
        n += 1;
        name = format!("{}_{}", candidate, n);
    }
    used.insert(name.clone());
    name
}

fn rename_occurrences(table: &Table, dup_names: &[String], log: &mut MergeLog) -> Table {
    let mut used: HashSet<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let mut result = table.clone();
    for name in dup_names {
        let positions = positions_of(&table.columns, name);
        let mut new_names = Vec::new();
        let mut n = 0;
        for &pos in positions.iter().skip(1) {
            // skip suffixes some other column already carries
            let new_name = loop {
                n += 1;
                let candidate = format!("{}_{}", name, n);
                if used.insert(candidate.clone()) {
                    break candidate;
                }
            };
            result.columns[pos].name = new_name.clone();
            new_names.push(new_name);
        }
        log.info(format!("Renamed duplicate '{}' occurrences to {}", name, new_names.join(", ")));
    }
    result
}

fn keep_one_occurrence(
    table: &Table,
    dup_names: &[String],
    strategy: DuplicateColumnStrategy,
    log: &mut MergeLog,
) -> Table {
    let mut removed: HashSet<usize> = HashSet::new();
    for name in dup_names {
        let positions = positions_of(&table.columns, name);
        let dropped: Vec<usize> = match strategy {
            DuplicateColumnStrategy::Last => positions[..positions.len() - 1].to_vec(),
            _ => positions[1..].to_vec(),
        };
        log.info(format!(
            "Kept {} '{}', dropped {} duplicate column(s)",
            strategy,
            name,
            dropped.len()
        ));
        removed.extend(dropped);
    }

    let keep: Vec<usize> = (0..table.column_count())
        .filter(|i| !removed.contains(i))
        .collect();
    table.select_indices(&keep)
}

fn merge_occurrences(table: &Table, dup_names: &[String], log: &mut MergeLog) -> Table {
    let mut removed: HashSet<usize> = HashSet::new();
    let mut replacements: Vec<(usize, Vec<CellValue>)> = Vec::new();

    for name in dup_names {
        let positions = positions_of(&table.columns, name);
        match merge_group(&table.rows, &positions) {
            Ok(values) => {
                replacements.push((positions[0], values));
                removed.extend(positions[1..].iter().copied());
                log.info(format!(
                    "Merged {} duplicate columns for '{}'",
                    positions.len(),
                    name
                ));
            }
            Err(e) => log.warn(format!(
                "Failed to merge duplicate columns for '{}': {}",
                name, e
            )),
        }
    }

    let mut rows: Vec<Row> = table.rows.clone();
    for (slot, values) in replacements {
        for (row, value) in rows.iter_mut().zip(values) {
            row.cells[slot] = value;
        }
    }

    let keep: Vec<usize> = (0..table.column_count())
        .filter(|i| !removed.contains(i))
        .collect();
    table.with_rows(rows).select_indices(&keep)
}

/// Per row: distinct non-missing values across `positions`, joined in order
fn merge_group(rows: &[Row], positions: &[usize]) -> Result<Vec<CellValue>> {
    rows.iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let mut parts: Vec<String> = Vec::new();
            for &pos in positions {
                let cell = row.get(pos).ok_or(Error::RaggedRow {
                    row: row_idx,
                    expected: pos + 1,
                    found: row.cells.len(),
                })?;
                if cell.is_missing() {
                    continue;
                }
                let text = cell.to_string_value();
                if !parts.contains(&text) {
                    parts.push(text);
                }
            }

            Ok(if parts.is_empty() {
                CellValue::Missing
            } else {
                CellValue::String(parts.join(MERGE_SEPARATOR))
            })
        })
        .collect()
}
