//! Final row-level passes: duplicate removal and ordering

use crate::config::{DuplicateRowKeep, MergeConfig, SortOption, SortOrder};
use crate::datetime::parse_date;
use crate::error::{Error, Result};
use crate::report::MergeLog;
use crate::table::{CellValue, Row, Table};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Apply duplicate removal and the configured sort to a combined table
///
/// `date_columns` are the date-like column names of `table`, in column order.
pub fn post_process(
    table: &Table,
    config: &MergeConfig,
    date_columns: &[String],
    log: &mut MergeLog,
) -> Table {
    let deduped = if config.remove_duplicate_rows {
        remove_duplicate_rows(table, config.duplicate_row_keep, log)
    } else {
        table.clone()
    };

    match config.sort_option {
        SortOption::None => deduped,
        SortOption::Date => {
            sort_by_date(&deduped, date_columns.first().map(String::as_str), log)
        }
        SortOption::Custom => match config.sort_column.as_deref() {
            Some(column) => sort_by_column(&deduped, column, config.sort_order, log),
            None => {
                log.warn("Custom sort skipped: no sort column configured");
                deduped
            }
        },
    }
}

/// Drop rows identical across all columns, keeping the first or last copy
///
/// Surviving rows keep their relative order.
pub fn remove_duplicate_rows(table: &Table, keep: DuplicateRowKeep, log: &mut MergeLog) -> Table {
    let before = table.row_count();
    let mut seen = HashSet::new();

    let rows: Vec<Row> = match keep {
        DuplicateRowKeep::First => table
            .rows
            .iter()
            .filter(|row| seen.insert(row.key()))
            .cloned()
            .collect(),
        DuplicateRowKeep::Last => {
            let mut kept: Vec<Row> = table
                .rows
                .iter()
                .rev()
                .filter(|row| seen.insert(row.key()))
                .cloned()
                .collect();
            kept.reverse();
            kept
        }
    };

    log.info(format!(
        "Removed duplicate rows: before={}, after={}",
        before,
        rows.len()
    ));
    table.with_rows(rows)
}

/// Coerce `date_column` to dates and sort ascending by it, missing last
///
/// Cells that do not parse become missing. With no date column the table is
/// returned unchanged.
pub fn sort_by_date(table: &Table, date_column: Option<&str>, log: &mut MergeLog) -> Table {
    let Some(name) = date_column else {
        log.info("No date column found; order unchanged");
        return table.clone();
    };
    let Some(idx) = table.column_index(name) else {
        log.warn(format!("Date sort skipped: column '{}' not found", name));
        return table.clone();
    };

    let mut unparsed = 0;
    let mut rows = table.rows.clone();
    for row in &mut rows {
        if let Some(cell) = row.cells.get_mut(idx) {
            let parsed = parse_date(cell);
            if parsed.is_none() && !cell.is_missing() {
                unparsed += 1;
            }
            *cell = parsed.map_or(CellValue::Missing, CellValue::Date);
        }
    }

    rows.sort_by(|a, b| compare_cells(a.get(idx), b.get(idx), SortOrder::Ascending));

    if unparsed > 0 {
        log.warn(format!(
            "{} value(s) in '{}' could not be parsed as dates",
            unparsed, name
        ));
    }
    log.info(format!("Sorted by date column '{}'", name));
    table.with_rows(rows)
}

/// Stable sort by one column's raw values, missing values last
///
/// Absent or unorderable columns leave the order unchanged and are logged.
pub fn sort_by_column(table: &Table, column: &str, order: SortOrder, log: &mut MergeLog) -> Table {
    match try_sort_by_column(table, column, order) {
        Ok(sorted) => {
            log.info(format!("Sorted by '{}' ({})", column, order));
            sorted
        }
        Err(e) => {
            log.warn(format!("Sort skipped: {}", e));
            table.clone()
        }
    }
}

fn try_sort_by_column(table: &Table, column: &str, order: SortOrder) -> Result<Table> {
    let idx = table
        .column_index(column)
        .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;
    check_orderable(table, idx)?;

    let mut rows = table.rows.clone();
    rows.sort_by(|a, b| compare_cells(a.get(idx), b.get(idx), order));
    Ok(table.with_rows(rows))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortClass {
    Number,
    Text,
    Date,
}

fn sort_class(cell: &CellValue) -> Option<SortClass> {
    match cell {
        CellValue::Integer(_) | CellValue::Float(_) => Some(SortClass::Number),
        CellValue::String(_) => Some(SortClass::Text),
        CellValue::Date(_) => Some(SortClass::Date),
        CellValue::Missing => None,
    }
}

fn check_orderable(table: &Table, idx: usize) -> Result<()> {
    let mut class = None;
    for this in table.column_values(idx).filter_map(sort_class) {
        match class {
            None => class = Some(this),
            Some(c) if c == this => {}
            Some(_) => return Err(Error::Unorderable(table.columns[idx].name.clone())),
        }
    }
    Ok(())
}

/// Order two cells of one column; missing sorts last regardless of `order`
fn compare_cells(a: Option<&CellValue>, b: Option<&CellValue>, order: SortOrder) -> Ordering {
    let a = a.unwrap_or(&CellValue::Missing);
    let b = b.unwrap_or(&CellValue::Missing);

    let ord = match (a, b) {
        (CellValue::Missing, CellValue::Missing) => return Ordering::Equal,
        (CellValue::Missing, _) => return Ordering::Greater,
        (_, CellValue::Missing) => return Ordering::Less,
        (CellValue::String(x), CellValue::String(y)) => x.cmp(y),
        (CellValue::Date(x), CellValue::Date(y)) => x.cmp(y),
        (x, y) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
    };

    match order {
        SortOrder::Ascending => ord,
        SortOrder::Descending => ord.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    fn column(table: &Table, name: &str) -> Vec<String> {
        let idx = table.column_index(name).unwrap();
        table.column_values(idx).map(|c| c.to_string_value()).collect()
    }

    #[test]
    fn test_dedup_keep_first_and_last() {
        let table = parse_csv_str("a,b\n1,x\n1,x\n2,y\n", "t.csv").unwrap();

        for keep in [DuplicateRowKeep::First, DuplicateRowKeep::Last] {
            let mut log = MergeLog::new();
            let result = remove_duplicate_rows(&table, keep, &mut log);
            assert_eq!(column(&result, "a"), vec!["1", "2"]);
            assert!(log.contains("before=3, after=2"));
        }
    }

    #[test]
    fn test_dedup_keep_last_preserves_relative_order() {
        let table = parse_csv_str("a\n1\n2\n1\n3\n", "t.csv").unwrap();
        let mut log = MergeLog::new();

        let result = remove_duplicate_rows(&table, DuplicateRowKeep::Last, &mut log);
        assert_eq!(column(&result, "a"), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_dedup_integral_float_equals_integer() {
        let table = parse_csv_str("a\n1\n1.0\n", "t.csv").unwrap();
        let mut log = MergeLog::new();

        let result = remove_duplicate_rows(&table, DuplicateRowKeep::First, &mut log);
        assert_eq!(result.row_count(), 1);
    }

    #[test]
    fn test_sort_by_date_coerces_and_puts_unknown_last() {
        let table = parse_csv_str(
            "order_date,v\n2024-03-01,a\nsoon,b\n2023-12-31,c\n2024/01/15,d\n",
            "t.csv",
        )
        .unwrap();
        let mut log = MergeLog::new();

        let result = sort_by_date(&table, Some("order_date"), &mut log);

        assert_eq!(column(&result, "v"), vec!["c", "d", "a", "b"]);
        assert_eq!(result.rows[3].cells[0], CellValue::Missing);
        assert!(log.contains("could not be parsed"));
    }

    #[test]
    fn test_sort_by_date_without_date_column() {
        let table = parse_csv_str("v\n3\n1\n2\n", "t.csv").unwrap();
        let mut log = MergeLog::new();

        let result = sort_by_date(&table, None, &mut log);

        assert_eq!(column(&result, "v"), vec!["3", "1", "2"]);
        assert!(log.contains("No date column found"));
    }

    #[test]
    fn test_sort_by_column_numeric_descending_missing_last() {
        let table = parse_csv_str("v,tag\n2,a\n,b\n10,c\n1.5,d\n", "t.csv").unwrap();
        let mut log = MergeLog::new();

        let result = sort_by_column(&table, "v", SortOrder::Descending, &mut log);
        assert_eq!(column(&result, "tag"), vec!["c", "a", "d", "b"]);

        let result = sort_by_column(&table, "v", SortOrder::Ascending, &mut log);
        assert_eq!(column(&result, "tag"), vec!["d", "a", "c", "b"]);
    }

    #[test]
    fn test_sort_by_column_is_stable() {
        let table = parse_csv_str("k,tag\nb,1\na,2\nb,3\na,4\n", "t.csv").unwrap();
        let mut log = MergeLog::new();

        let result = sort_by_column(&table, "k", SortOrder::Ascending, &mut log);
        assert_eq!(column(&result, "tag"), vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn test_sort_by_column_skips_unorderable_and_absent() {
        let table = parse_csv_str("v\n2\nabc\n1\n", "t.csv").unwrap();
        let mut log = MergeLog::new();

        let result = sort_by_column(&table, "v", SortOrder::Ascending, &mut log);
        assert_eq!(column(&result, "v"), vec!["2", "abc", "1"]);
        assert!(log.contains("mixes numeric and text"));

        let result = sort_by_column(&table, "nope", SortOrder::Ascending, &mut log);
        assert_eq!(result.row_count(), 3);
        assert!(log.contains("column 'nope' not found"));
    }

    #[test]
    fn test_post_process_none_keeps_order() {
        let table = parse_csv_str("v\n3\n1\n3\n", "t.csv").unwrap();
        let mut log = MergeLog::new();

        let result = post_process(&table, &MergeConfig::default(), &[], &mut log);
        assert_eq!(column(&result, "v"), vec!["3", "1", "3"]);
        assert!(log.is_empty());
    }
}
