//! Per-table row and column transformations
//!
//! Applied to each loaded table before combination, always in the same order:
//! selection, mapping, filtering, then missing-data handling. Every step takes
//! a table by reference and returns a new one.

use crate::config::{FilterOperator, FilterRule, MergeConfig, MissingDataStrategy};
use crate::error::{Error, Result};
use crate::report::MergeLog;
use crate::table::{CellValue, Row, Table};
use std::collections::{BTreeMap, HashSet};

/// Literal used by the `na` missing-data strategy
pub const NA_MARKER: &str = "N/A";

/// Run the full per-table transformation chain
///
/// A ragged table is rejected; a failing filter rule is logged and skipped.
pub fn transform_table(table: &Table, config: &MergeConfig, log: &mut MergeLog) -> Result<Table> {
    table.validate()?;

    let selected = select_columns(table, config.selection_for(&table.source_path));
    let mapped = map_columns(&selected, &config.column_mapping);
    let filtered = apply_filters(&mapped, &config.filters, log);
    Ok(handle_missing(&filtered, config.missing_data_strategy))
}

/// Keep only the listed columns that exist, in the table's own order
pub fn select_columns(table: &Table, selection: Option<&[String]>) -> Table {
    let Some(selection) = selection else {
        return table.clone();
    };

    let wanted: HashSet<&str> = selection.iter().map(String::as_str).collect();
    let keep: Vec<usize> = table
        .columns
        .iter()
        .filter(|c| wanted.contains(c.name.as_str()))
        .map(|c| c.index)
        .collect();
    table.select_indices(&keep)
}

/// Rename columns found in `mapping`; unknown mapping keys are ignored
pub fn map_columns(table: &Table, mapping: &BTreeMap<String, String>) -> Table {
    let mut result = table.clone();
    for col in result.columns.iter_mut() {
        if let Some(new_name) = mapping.get(&col.name) {
            col.name = new_name.clone();
        }
    }
    result
}

/// Apply rules in order, each narrowing the rows further
pub fn apply_filters(table: &Table, rules: &[FilterRule], log: &mut MergeLog) -> Table {
    let mut current = table.clone();
    for rule in rules {
        let before = current.row_count();
        match apply_filter(&current, rule) {
            Ok(filtered) => {
                log.info(format!(
                    "Filter '{}' kept {} of {} rows",
                    rule,
                    filtered.row_count(),
                    before
                ));
                current = filtered;
            }
            Err(e) => log.warn(format!("Skipped filter '{}': {}", rule, e)),
        }
    }
    current
}

/// Apply a single filter rule
pub fn apply_filter(table: &Table, rule: &FilterRule) -> Result<Table> {
    let idx = table
        .column_index(&rule.column)
        .ok_or_else(|| Error::ColumnNotFound(rule.column.clone()))?;

    let rows: Vec<Row> = match rule.operator {
        FilterOperator::Eq | FilterOperator::Ne => {
            let want_equal = rule.operator == FilterOperator::Eq;
            keep_rows(table, idx, |cell| literal_equals(cell, &rule.value) == want_equal)
        }
        FilterOperator::Contains => keep_rows(table, idx, |cell| match cell {
            CellValue::Missing => false,
            other => other.to_string_value().contains(rule.value.as_str()),
        }),
        op => {
            let threshold: f64 = rule.value.trim().parse().map_err(|_| Error::Filter {
                column: rule.column.clone(),
                message: format!("'{}' is not a number", rule.value),
            })?;

            if let Some(bad) = table
                .column_values(idx)
                .find(|c| !c.is_missing() && !c.is_numeric())
            {
                return Err(Error::Filter {
                    column: rule.column.clone(),
                    message: format!("cannot compare '{}' with a number", bad),
                });
            }

            keep_rows(table, idx, |cell| {
                cell.as_f64()
                    .is_some_and(|v| compare_numbers(op, v, threshold))
            })
        }
    };

    Ok(table.with_rows(rows))
}

fn keep_rows<F>(table: &Table, idx: usize, mut predicate: F) -> Vec<Row>
where
    F: FnMut(&CellValue) -> bool,
{
    table
        .rows
        .iter()
        .filter(|row| predicate(row.get(idx).unwrap_or(&CellValue::Missing)))
        .cloned()
        .collect()
}

/// Raw equality: only a text cell can equal the configured literal
fn literal_equals(cell: &CellValue, value: &str) -> bool {
    matches!(cell, CellValue::String(s) if s == value)
}

fn compare_numbers(op: FilterOperator, left: f64, right: f64) -> bool {
    match op {
        FilterOperator::Gt => left > right,
        FilterOperator::Lt => left < right,
        FilterOperator::Ge => left >= right,
        FilterOperator::Le => left <= right,
        _ => false,
    }
}

/// Apply a missing-value policy to every column
pub fn handle_missing(table: &Table, strategy: MissingDataStrategy) -> Table {
    match strategy {
        MissingDataStrategy::Keep => table.clone(),
        MissingDataStrategy::Drop => {
            let rows = table
                .rows
                .iter()
                .filter(|r| !r.has_missing())
                .cloned()
                .collect();
            table.with_rows(rows)
        }
        MissingDataStrategy::Zero => fill_constant(table, CellValue::Integer(0)),
        MissingDataStrategy::Na => fill_constant(table, CellValue::String(NA_MARKER.to_string())),
        MissingDataStrategy::Ffill => {
            let mut result = table.clone();
            fill_forward(result.rows.iter_mut(), table.column_count());
            result
        }
        MissingDataStrategy::Bfill => {
            let mut result = table.clone();
            fill_forward(result.rows.iter_mut().rev(), table.column_count());
            result
        }
    }
}

fn fill_constant(table: &Table, value: CellValue) -> Table {
    let mut result = table.clone();
    for cell in result.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
        if cell.is_missing() {
            *cell = value.clone();
        }
    }
    result
}

/// Carry the last seen value of each column over missing cells, in iteration order
fn fill_forward<'a, I>(rows: I, width: usize)
where
    I: Iterator<Item = &'a mut Row>,
{
    let mut last: Vec<Option<CellValue>> = vec![None; width];
    for row in rows {
        for (cell, seen) in row.cells.iter_mut().zip(last.iter_mut()) {
            if cell.is_missing() {
                if let Some(value) = seen {
                    *cell = value.clone();
                }
            } else {
                *seen = Some(cell.clone());
            }
        }
    }
}
