//! Integration tests for the merge pipeline.

use std::collections::BTreeSet;
use std::fs;

use proptest::prelude::*;

use csvmerge_core::postprocess::remove_duplicate_rows;
use csvmerge_core::{
    export_table, merge_files, outer_join, parse_csv, scan_directory, CellValue,
    DuplicateColumnStrategy, DuplicateRowKeep, ExportFormat, FilterOperator, FilterRule,
    MergeConfig, MergeLog, MergePipeline, MergeType, MissingDataStrategy, SortOption, SortOrder,
    Table,
};

fn int_table(name: &str, columns: &[&str], rows: &[Vec<i64>]) -> Table {
    Table::from_parts(
        name,
        columns.iter().copied(),
        rows.iter()
            .map(|r| r.iter().copied().map(CellValue::Integer).collect())
            .collect(),
    )
}

fn strings(table: &Table, column: &str) -> Vec<String> {
    let idx = table.column_index(column).unwrap();
    table.column_values(idx).map(|c| c.to_string_value()).collect()
}

#[test]
fn test_merge_directory_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("jan.csv"),
        "order_date,region,amount\n2024-01-20,north,120\n2024-01-05,south,80\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("feb.csv"),
        "order_date,region,amount\n2024-02-02,north,NA\n2024-01-05,south,80\n",
    )
    .unwrap();

    let files = scan_directory(dir.path(), false).unwrap();
    assert_eq!(files.len(), 2);

    let config = MergeConfig {
        column_mapping: [("amount".to_string(), "total".to_string())].into(),
        filters: vec![FilterRule::new("region", FilterOperator::Eq, "north")],
        missing_data_strategy: MissingDataStrategy::Zero,
        ..MergeConfig::default()
    };
    let result = merge_files(&files, &config).unwrap();

    // feb.csv sorts first; jan.csv columns are renamed for stacking
    assert_eq!(
        result.table.column_names(),
        vec!["order_date", "region", "total", "order_date_1", "region_1", "total_1"]
    );
    assert_eq!(result.row_count, 2);
    assert_eq!(strings(&result.table, "total"), vec!["0", ""]);
    assert!(result.log.iter().any(|l| l == "1. Loaded feb.csv: rows=1, cols=3"));
    assert!(result.log.iter().any(|l| l == "Filter 'region == north' kept 1 of 2 rows"));

    let out = dir.path().join("out").join("merged_data.json");
    export_table(&result.table, &out, ExportFormat::Json).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["total"], serde_json::json!(0));
    assert!(json[0]["total_1"].is_null());
}

#[test]
fn test_join_with_merge_strategy_and_custom_sort() {
    let customers = csvmerge_core::parse_csv_str(
        "id,city,name\n1,NYC,Ann\n2,,Bob\n3,LA,Cy\n",
        "customers.csv",
    )
    .unwrap();
    let orders = csvmerge_core::parse_csv_str(
        "id,city,spend\n2,NYC,40\n3,SF,15\n4,Oslo,99\n",
        "orders.csv",
    )
    .unwrap();

    let config = MergeConfig {
        merge_type: MergeType::Join,
        join_key_left: Some("id".to_string()),
        join_key_right: Some("id".to_string()),
        duplicate_column_strategy: DuplicateColumnStrategy::Merge,
        sort_option: SortOption::Custom,
        sort_column: Some("spend".to_string()),
        sort_order: SortOrder::Descending,
        ..MergeConfig::default()
    };
    let result = MergePipeline::new(&config).run(vec![customers, orders]).unwrap();

    assert_eq!(result.table.column_names(), vec!["id", "city", "name", "spend"]);
    assert_eq!(strings(&result.table, "id"), vec!["4", "2", "3", "1"]);
    assert_eq!(strings(&result.table, "city"), vec!["Oslo", "NYC", "LA | SF", "NYC"]);
    assert!(result.log.iter().any(|l| l.contains("Merged 2 duplicate columns for 'city'")));
}

#[test]
fn test_unreadable_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.csv");
    fs::write(&good, "a\n1\n").unwrap();
    let missing = dir.path().join("missing.csv");

    let result = merge_files(&[good, missing], &MergeConfig::default()).unwrap();

    assert_eq!(result.row_count, 1);
    assert!(result.log.iter().any(|l| l.starts_with("2. Failed to read missing.csv")));
}

#[test]
fn test_tsv_export_round_trip_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let table = int_table("t.csv", &["a", "b"], &[vec![1, 2], vec![3, 4]]);
    let path = dir.path().join("out.tsv");

    export_table(&table, &path, ExportFormat::Tsv).unwrap();
    let back = parse_csv(&path).unwrap();

    assert_eq!(back.column_names(), vec!["a", "b"]);
    assert_eq!(back.rows, table.rows);
}

fn small_rows(width: usize) -> impl Strategy<Value = Vec<Vec<i64>>> {
    prop::collection::vec(prop::collection::vec(0i64..5, width), 0..12)
}

proptest! {
    #[test]
    fn prop_concatenate_row_count_is_sum(
        tables in prop::collection::vec(small_rows(2), 1..5)
    ) {
        let inputs: Vec<Table> = tables
            .iter()
            .enumerate()
            .map(|(i, rows)| int_table(&format!("t{}.csv", i), &["x", "y"], rows))
            .collect();
        let expected: usize = tables.iter().map(Vec::len).sum();

        let result = MergePipeline::new(&MergeConfig::default()).run(inputs).unwrap();
        prop_assert_eq!(result.row_count, expected);
        prop_assert_eq!(result.column_count, 2 * tables.len());
    }

    #[test]
    fn prop_sort_none_keeps_row_order(rows in small_rows(3)) {
        let table = int_table("t.csv", &["a", "b", "c"], &rows);

        let result = MergePipeline::new(&MergeConfig::default())
            .run(vec![table.clone()])
            .unwrap();
        prop_assert_eq!(result.table.rows, table.rows);
    }

    #[test]
    fn prop_dedup_is_idempotent(rows in small_rows(2), keep_last in any::<bool>()) {
        let keep = if keep_last { DuplicateRowKeep::Last } else { DuplicateRowKeep::First };
        let table = int_table("t.csv", &["a", "b"], &rows);
        let mut log = MergeLog::new();

        let once = remove_duplicate_rows(&table, keep, &mut log);
        let twice = remove_duplicate_rows(&once, keep, &mut log);

        let distinct: BTreeSet<&Vec<i64>> = rows.iter().collect();
        prop_assert_eq!(once.row_count(), distinct.len());
        prop_assert_eq!(once.rows, twice.rows);
    }

    #[test]
    fn prop_outer_join_keeps_every_key(
        left in prop::collection::vec(0i64..8, 0..10),
        right in prop::collection::vec(0i64..8, 0..10),
    ) {
        let l = int_table("l.csv", &["k"], &left.iter().map(|&k| vec![k]).collect::<Vec<_>>());
        let r = int_table("r.csv", &["k"], &right.iter().map(|&k| vec![k]).collect::<Vec<_>>());

        let joined = outer_join(&l, &r, "k", "k").unwrap();

        let keys: BTreeSet<i64> = joined
            .column_values(0)
            .filter_map(|c| match c {
                CellValue::Integer(i) => Some(*i),
                _ => None,
            })
            .collect();
        let expected: BTreeSet<i64> = left.iter().chain(&right).copied().collect();
        prop_assert_eq!(keys, expected);
        prop_assert!(joined.row_count() >= left.len().max(right.len()));
    }
}
