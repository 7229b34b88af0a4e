//! csvmerge-core: Core library for merging delimited tabular files
//!
//! This library provides functionality to:
//! - Scan directories for CSV/TSV files and parse them into tables
//! - Select, rename, filter and fill columns per input table
//! - Stack tables or full-outer-join them on a key column
//! - Reconcile duplicate column names with a configurable strategy
//! - Remove duplicate rows and sort by date or by a chosen column
//! - Export the merged table as CSV, TSV or JSON records

pub mod config;
pub mod datetime;
pub mod error;
pub mod export;
pub mod merger;
pub mod parser;
pub mod pipeline;
pub mod postprocess;
pub mod report;
pub mod scanner;
pub mod schema;
pub mod stats;
pub mod table;
pub mod transform;

pub use config::{
    BatchFile, BatchJob, DuplicateColumnStrategy, DuplicateRowKeep, FilterOperator, FilterRule,
    MergeConfig, MergeType, MissingDataStrategy, SortOption, SortOrder,
};
pub use error::{Error, Result};
pub use export::{export_table, output_path, ExportFormat};
pub use merger::{combine, concatenate, outer_join};
pub use parser::{parse_csv, parse_csv_str};
pub use pipeline::{merge_files, CancelFlag, MergePipeline, MergeResult};
pub use report::{MergeLog, MERGE_LOG_TARGET};
pub use scanner::{expand_inputs, scan_directory};
pub use stats::{table_stats, ColumnKind, TableStats};
pub use table::{CellValue, Column, Row, Table};
