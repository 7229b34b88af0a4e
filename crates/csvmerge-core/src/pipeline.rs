//! Merge orchestration: transform each table, combine, post-process

use crate::config::MergeConfig;
use crate::error::{Error, Result};
use crate::merger::combine;
use crate::parser::parse_csv;
use crate::postprocess::post_process;
use crate::report::MergeLog;
use crate::schema::detect_date_columns;
use crate::table::{display_name, Table};
use crate::transform::transform_table;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag for cooperative cancellation between tables
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one merge run
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub table: Table,
    pub row_count: usize,
    pub column_count: usize,
    /// Step outcomes in the order they happened
    pub log: Vec<String>,
}

/// One merge run over a fixed configuration
///
/// ```no_run
/// use csvmerge_core::{MergeConfig, MergePipeline};
///
/// let config = MergeConfig::default();
/// let result = MergePipeline::new(&config)
///     .run_sources(&["a.csv", "b.csv"], |p| csvmerge_core::parse_csv(p))
///     .unwrap();
/// println!("{} rows", result.row_count);
/// ```
#[derive(Debug, Clone)]
pub struct MergePipeline<'a> {
    config: &'a MergeConfig,
    cancel: CancelFlag,
}

impl<'a> MergePipeline<'a> {
    pub fn new(config: &'a MergeConfig) -> Self {
        Self {
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Observe `cancel` between tables
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Merge tables that are already in memory
    pub fn run(&self, tables: Vec<Table>) -> Result<MergeResult> {
        let mut log = MergeLog::new();
        let mut transformed = Vec::with_capacity(tables.len());

        for (i, table) in tables.iter().enumerate() {
            self.check_cancelled()?;
            if let Some(t) = self.transform_one(i + 1, table, &mut log) {
                transformed.push(t);
            }
        }

        self.finish(transformed, log)
    }

    /// Load each path with `loader`, then merge
    ///
    /// A source that fails to load is logged and skipped.
    pub fn run_sources<P, F>(&self, paths: &[P], mut loader: F) -> Result<MergeResult>
    where
        P: AsRef<Path>,
        F: FnMut(&Path) -> Result<Table>,
    {
        let mut log = MergeLog::new();
        let mut transformed = Vec::with_capacity(paths.len());

        for (i, path) in paths.iter().enumerate() {
            self.check_cancelled()?;
            let path = path.as_ref();
            match loader(path) {
                Ok(table) => {
                    if let Some(t) = self.transform_one(i + 1, &table, &mut log) {
                        transformed.push(t);
                    }
                }
                Err(e) => log.warn(format!(
                    "{}. Failed to read {}: {}",
                    i + 1,
                    display_name(path),
                    e
                )),
            }
        }

        self.finish(transformed, log)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn transform_one(&self, position: usize, table: &Table, log: &mut MergeLog) -> Option<Table> {
        match transform_table(table, self.config, log) {
            Ok(t) => {
                log.info(format!(
                    "{}. Loaded {}: rows={}, cols={}",
                    position,
                    table.label(),
                    t.row_count(),
                    t.column_count()
                ));
                Some(t)
            }
            Err(e) => {
                log.warn(format!("{}. Failed to transform {}: {}", position, table.label(), e));
                None
            }
        }
    }

    fn finish(&self, tables: Vec<Table>, mut log: MergeLog) -> Result<MergeResult> {
        if tables.is_empty() {
            return Err(Error::NoTables);
        }
        self.check_cancelled()?;

        let combined = combine(&tables, self.config, &mut log)?;
        let date_columns = detect_date_columns(&combined.columns);
        let table = post_process(&combined, self.config, &date_columns, &mut log);

        let row_count = table.row_count();
        let column_count = table.column_count();
        log.info(format!(
            "Total rows: {}, Total columns: {}",
            row_count, column_count
        ));

        Ok(MergeResult {
            table,
            row_count,
            column_count,
            log: log.into_entries(),
        })
    }
}

/// Load and merge CSV/TSV files with the built-in loader
pub fn merge_files<P: AsRef<Path>>(paths: &[P], config: &MergeConfig) -> Result<MergeResult> {
    MergePipeline::new(config).run_sources(paths, |p| parse_csv(p))
}
