//! Combine transformed tables by stacking rows or by key-based outer join

use crate::config::{DuplicateColumnStrategy, MergeConfig, MergeType};
use crate::error::{Error, Result};
use crate::report::MergeLog;
use crate::schema::{reconcile_for_stacking, resolve_duplicate_columns};
use crate::table::{CellKey, CellValue, Column, Row, Table};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Identity given to combined tables
pub const MERGED_SOURCE: &str = "merged";

/// Combine tables according to the configured merge type
///
/// Stacking renames shared column names first; a name repeated inside a
/// single input is numbered afterwards. Joining resolves duplicate columns
/// using `duplicate_column_strategy`.
pub fn combine(tables: &[Table], config: &MergeConfig, log: &mut MergeLog) -> Result<Table> {
    if tables.is_empty() {
        return Err(Error::NoTables);
    }

    match config.merge_type {
        MergeType::Concatenate => {
            let reconciled = reconcile_for_stacking(tables, log);
            let stacked = concatenate(&reconciled)?;
            Ok(resolve_duplicate_columns(
                &stacked,
                DuplicateColumnStrategy::KeepAll,
                log,
            ))
        }
        MergeType::Join => join_all(
            tables,
            config.join_key_left.as_deref(),
            config.join_key_right.as_deref(),
            config.duplicate_column_strategy,
            log,
        ),
    }
}

/// Stack rows top to bottom, unioning columns by name in first-seen order
///
/// A name repeated inside one table is matched by occurrence, so the second
/// `x` of one table lines up with the second `x` of another.
pub fn concatenate(tables: &[Table]) -> Result<Table> {
    if tables.is_empty() {
        return Err(Error::NoTables);
    }

    // Build unified column list (union of all columns)
    let mut column_keys: Vec<(String, usize)> = Vec::new();
    let mut col_index: BTreeMap<(String, usize), usize> = BTreeMap::new();
    let mut per_table: Vec<Vec<usize>> = Vec::with_capacity(tables.len());

    for table in tables {
        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        let mut mapping = Vec::with_capacity(table.column_count());
        for col in &table.columns {
            let nth = occurrences.entry(col.name.as_str()).or_default();
            let key = (col.name.clone(), *nth);
            *nth += 1;

            let unified = *col_index.entry(key.clone()).or_insert_with(|| {
                column_keys.push(key);
                column_keys.len() - 1
            });
            mapping.push(unified);
        }
        per_table.push(mapping);
    }

    let width = column_keys.len();
    let mut rows = Vec::with_capacity(tables.iter().map(Table::row_count).sum());
    for (table, mapping) in tables.iter().zip(&per_table) {
        for row in &table.rows {
            let mut cells = vec![CellValue::Missing; width];
            for (cell, &unified) in row.cells.iter().zip(mapping) {
                cells[unified] = cell.clone();
            }
            rows.push(cells);
        }
    }

    Ok(Table::from_parts(
        MERGED_SOURCE,
        column_keys.into_iter().map(|(name, _)| name),
        rows,
    ))
}

/// Join every table onto the first, then resolve duplicate column names
///
/// A table that cannot be joined is logged and left out; the chain continues.
pub fn join_all(
    tables: &[Table],
    left_key: Option<&str>,
    right_key: Option<&str>,
    strategy: DuplicateColumnStrategy,
    log: &mut MergeLog,
) -> Result<Table> {
    let (first, rest) = tables.split_first().ok_or(Error::NoTables)?;
    let mut acc = first.clone();
    acc.source_path = PathBuf::from(MERGED_SOURCE);

    for other in rest {
        let joined = match (left_key, right_key) {
            (Some(lk), Some(rk)) => outer_join(&acc, other, lk, rk),
            _ => Err(Error::Join("join key columns are not configured".to_string())),
        };

        match joined {
            Ok(table) => {
                log.info(format!(
                    "Joined {}: rows={}, cols={}",
                    other.label(),
                    table.row_count(),
                    table.column_count()
                ));
                acc = table;
            }
            Err(e) => log.warn(format!("Join failed for {}: {}", other.label(), e)),
        }
    }

    Ok(resolve_duplicate_columns(&acc, strategy, log))
}

/// Full outer join of `left` and `right` on `left.left_key == right.right_key`
///
/// Output columns are all left columns followed by all right columns. When
/// both key columns share a name the right one is dropped and its value fills
/// the left key for right-only rows. Rows follow the left table's order, with
/// unmatched right rows appended in their own order. Missing keys never match.
pub fn outer_join(left: &Table, right: &Table, left_key: &str, right_key: &str) -> Result<Table> {
    let li = left.column_index(left_key).ok_or_else(|| {
        Error::Join(format!("key column '{}' not found in {}", left_key, left.label()))
    })?;
    let ri = right.column_index(right_key).ok_or_else(|| {
        Error::Join(format!("key column '{}' not found in {}", right_key, right.label()))
    })?;
    check_key_kinds(left, li, right, ri)?;

    let shared_key = left_key == right_key;
    let right_cols: Vec<usize> = (0..right.column_count())
        .filter(|&i| !(shared_key && i == ri))
        .collect();

    let names: Vec<String> = left
        .columns
        .iter()
        .chain(right_cols.iter().map(|&i| &right.columns[i]))
        .map(|c: &Column| c.name.clone())
        .collect();

    let mut right_index: HashMap<CellKey, Vec<usize>> = HashMap::new();
    for (r, row) in right.rows.iter().enumerate() {
        if let Some(key) = join_key(row, ri) {
            right_index.entry(key).or_default().push(r);
        }
    }

    let right_part = |row: Option<&Row>| -> Vec<CellValue> {
        right_cols
            .iter()
            .map(|&i| {
                row.and_then(|r| r.get(i))
                    .cloned()
                    .unwrap_or(CellValue::Missing)
            })
            .collect()
    };

    let mut matched = vec![false; right.row_count()];
    let mut rows: Vec<Vec<CellValue>> = Vec::new();

    for lrow in &left.rows {
        let matches = join_key(lrow, li).and_then(|k| right_index.get(&k));
        match matches {
            Some(indices) => {
                for &r in indices {
                    matched[r] = true;
                    let mut cells = lrow.cells.clone();
                    cells.extend(right_part(Some(&right.rows[r])));
                    rows.push(cells);
                }
            }
            None => {
                let mut cells = lrow.cells.clone();
                cells.extend(right_part(None));
                rows.push(cells);
            }
        }
    }

    for (r, rrow) in right.rows.iter().enumerate() {
        if matched[r] {
            continue;
        }
        let mut cells = vec![CellValue::Missing; left.column_count()];
        if shared_key {
            cells[li] = rrow.get(ri).cloned().unwrap_or(CellValue::Missing);
        }
        cells.extend(right_part(Some(rrow)));
        rows.push(cells);
    }

    Ok(Table::from_parts(left.source_path.clone(), names, rows))
}

fn join_key(row: &Row, idx: usize) -> Option<CellKey> {
    match row.get(idx)?.key() {
        CellKey::Missing => None,
        key => Some(key),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Numeric,
    Text,
    Mixed,
    Empty,
}

fn key_kind(table: &Table, idx: usize) -> KeyKind {
    let mut kind = KeyKind::Empty;
    for cell in table.column_values(idx).filter(|c| !c.is_missing()) {
        let this = if cell.is_numeric() {
            KeyKind::Numeric
        } else {
            KeyKind::Text
        };
        kind = match kind {
            KeyKind::Empty => this,
            k if k == this => k,
            _ => return KeyKind::Mixed,
        };
    }
    kind
}

/// A purely numeric key cannot be joined against a purely textual one
fn check_key_kinds(left: &Table, li: usize, right: &Table, ri: usize) -> Result<()> {
    match (key_kind(left, li), key_kind(right, ri)) {
        (KeyKind::Numeric, KeyKind::Text) | (KeyKind::Text, KeyKind::Numeric) => Err(Error::Join(
            format!(
                "key '{}' in {} and key '{}' in {} have incompatible types",
                left.columns[li].name,
                left.label(),
                right.columns[ri].name,
                right.label()
            ),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    fn keys(table: &Table, name: &str) -> Vec<CellValue> {
        let idx = table.column_index(name).unwrap();
        table.column_values(idx).cloned().collect()
    }

    #[test]
    fn test_concatenate_unions_columns() {
        let a = parse_csv_str("id,name\n1,foo\n", "a.csv").unwrap();
        let b = parse_csv_str("id,extra\n2,bonus\n", "b.csv").unwrap();

        let result = concatenate(&[a, b]).unwrap();

        assert_eq!(result.column_names(), vec!["id", "name", "extra"]);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.rows[0].cells[2], CellValue::Missing);
        assert_eq!(result.rows[1].cells[1], CellValue::Missing);
        assert_eq!(result.rows[1].cells[2], CellValue::String("bonus".to_string()));
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_concatenate_preserves_source_order() {
        let a = parse_csv_str("v\n3\n1\n", "a.csv").unwrap();
        let b = parse_csv_str("v\n2\n", "b.csv").unwrap();

        let result = concatenate(&[a, b]).unwrap();
        assert_eq!(
            keys(&result, "v"),
            vec![CellValue::Integer(3), CellValue::Integer(1), CellValue::Integer(2)]
        );
    }

    #[test]
    fn test_combine_stacking_renames_shared_columns() {
        let a = parse_csv_str("date,value\n2024-01-01,1\n2024-01-02,2\n", "a.csv").unwrap();
        let b = parse_csv_str("date,value\n2024-02-01,3\n", "b.csv").unwrap();
        let mut log = MergeLog::new();

        let result = combine(&[a, b], &MergeConfig::default(), &mut log).unwrap();

        assert_eq!(result.column_names(), vec!["date", "value", "date_1", "value_1"]);
        assert_eq!(result.row_count(), 3);
    }

    #[test]
    fn test_combine_stacking_numbers_names_repeated_within_one_input() {
        let a = parse_csv_str("x,y\n1,2\n", "a.csv").unwrap();
        let renamed = crate::transform::map_columns(
            &a,
            &[("y".to_string(), "x".to_string())].into(),
        );
        let mut log = MergeLog::new();

        let result = combine(&[renamed], &MergeConfig::default(), &mut log).unwrap();

        assert_eq!(result.column_names(), vec!["x", "x_1"]);
        assert_eq!(result.rows[0].cells, vec![CellValue::Integer(1), CellValue::Integer(2)]);
    }

    #[test]
    fn test_combine_stacking_keeps_inputs_apart_when_suffix_is_taken() {
        let t0 = parse_csv_str("a,a_1\n1,100\n", "t0.csv").unwrap();
        let t1 = parse_csv_str("a\n2\n", "t1.csv").unwrap();
        let mut log = MergeLog::new();

        let result = combine(&[t0, t1], &MergeConfig::default(), &mut log).unwrap();

        assert_eq!(result.column_names(), vec!["a", "a_1", "a_1_1"]);
        assert_eq!(
            result.rows[0].cells,
            vec![CellValue::Integer(1), CellValue::Integer(100), CellValue::Missing]
        );
        assert_eq!(
            result.rows[1].cells,
            vec![CellValue::Missing, CellValue::Missing, CellValue::Integer(2)]
        );
    }

    #[test]
    fn test_outer_join_completeness() {
        let left = parse_csv_str("id,l\n1,a\n2,b\n3,c\n", "left.csv").unwrap();
        let right = parse_csv_str("id,r\n2,x\n3,y\n4,z\n", "right.csv").unwrap();

        let result = outer_join(&left, &right, "id", "id").unwrap();

        assert_eq!(result.column_names(), vec!["id", "l", "r"]);
        assert_eq!(result.row_count(), 4);
        assert_eq!(
            keys(&result, "id"),
            (1..=4).map(CellValue::Integer).collect::<Vec<_>>()
        );
        // key 1 only on the left, key 4 only on the right
        assert_eq!(result.rows[0].cells[2], CellValue::Missing);
        assert_eq!(result.rows[3].cells[1], CellValue::Missing);
        assert_eq!(result.rows[3].cells[2], CellValue::String("z".to_string()));
    }

    #[test]
    fn test_outer_join_different_key_names_keeps_both() {
        let left = parse_csv_str("id,l\n1,a\n2,b\n", "left.csv").unwrap();
        let right = parse_csv_str("user_id,r\n2,x\n5,y\n", "right.csv").unwrap();

        let result = outer_join(&left, &right, "id", "user_id").unwrap();

        assert_eq!(result.column_names(), vec!["id", "l", "user_id", "r"]);
        assert_eq!(result.row_count(), 3);
        assert_eq!(result.rows[2].cells[0], CellValue::Missing);
        assert_eq!(result.rows[2].cells[2], CellValue::Integer(5));
    }

    #[test]
    fn test_outer_join_cardinality() {
        let left = parse_csv_str("k,l\n1,a\n1,b\n", "left.csv").unwrap();
        let right = parse_csv_str("k,r\n1,x\n1,y\n1,z\n", "right.csv").unwrap();

        let result = outer_join(&left, &right, "k", "k").unwrap();
        assert_eq!(result.row_count(), 6);
    }

    #[test]
    fn test_outer_join_numeric_keys_match_across_int_and_float() {
        let left = parse_csv_str("k,l\n1,a\n", "left.csv").unwrap();
        let right = parse_csv_str("k,r\n1.0,x\n", "right.csv").unwrap();

        let result = outer_join(&left, &right, "k", "k").unwrap();
        assert_eq!(result.row_count(), 1);
    }

    #[test]
    fn test_outer_join_missing_keys_never_match() {
        let left = parse_csv_str("k,l\n,a\n", "left.csv").unwrap();
        let right = parse_csv_str("k,r\n,x\n", "right.csv").unwrap();

        let result = outer_join(&left, &right, "k", "k").unwrap();
        assert_eq!(result.row_count(), 2);
    }

    #[test]
    fn test_outer_join_incompatible_keys() {
        let left = parse_csv_str("k,l\n1,a\n", "left.csv").unwrap();
        let right = parse_csv_str("k,r\nabc,x\n", "right.csv").unwrap();

        assert!(matches!(outer_join(&left, &right, "k", "k"), Err(Error::Join(_))));
    }

    #[test]
    fn test_join_all_skips_failing_table() {
        let a = parse_csv_str("id,city\n1,NYC\n2,LA\n", "a.csv").unwrap();
        let b = parse_csv_str("other,v\n1,x\n", "b.csv").unwrap();
        let c = parse_csv_str("id,city\n1,NYC\n3,SF\n", "c.csv").unwrap();
        let mut log = MergeLog::new();

        let result = join_all(
            &[a, b, c],
            Some("id"),
            Some("id"),
            DuplicateColumnStrategy::Merge,
            &mut log,
        )
        .unwrap();

        assert!(log.contains("Join failed for b.csv"));
        assert_eq!(result.column_names(), vec!["id", "city"]);
        assert_eq!(result.row_count(), 3);
        assert_eq!(result.rows[0].cells[1], CellValue::String("NYC".to_string()));
        assert_eq!(result.rows[2].cells[1], CellValue::String("SF".to_string()));
    }

    #[test]
    fn test_join_keep_all_output_names_are_unique() {
        let left = parse_csv_str("id,v,v_1\n1,a,b\n", "l.csv").unwrap();
        let right = parse_csv_str("id,v\n1,c\n", "r.csv").unwrap();
        let mut log = MergeLog::new();

        let result = join_all(
            &[left, right],
            Some("id"),
            Some("id"),
            DuplicateColumnStrategy::KeepAll,
            &mut log,
        )
        .unwrap();

        assert_eq!(result.column_names(), vec!["id", "v", "v_1", "v_2"]);
        assert_eq!(result.rows[0].cells[3], CellValue::String("c".to_string()));
    }

    #[test]
    fn test_join_without_keys_logs_and_keeps_first() {
        let a = parse_csv_str("id\n1\n", "a.csv").unwrap();
        let b = parse_csv_str("id\n2\n", "b.csv").unwrap();
        let mut log = MergeLog::new();

        let result = join_all(&[a, b], None, None, DuplicateColumnStrategy::KeepAll, &mut log).unwrap();

        assert_eq!(result.row_count(), 1);
        assert!(log.contains("not configured"));
    }

    #[test]
    fn test_combine_empty_is_error() {
        let mut log = MergeLog::new();
        assert!(matches!(
            combine(&[], &MergeConfig::default(), &mut log),
            Err(Error::NoTables)
        ));
    }
}
