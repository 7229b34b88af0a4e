//! Merge configuration and batch files
//!
//! A [`MergeConfig`] is an immutable snapshot of every option the pipeline
//! understands. It is read from JSON (camelCase keys, all optional) or built in
//! code, and handed to [`crate::MergePipeline`] by reference.

use crate::error::{Error, Result};
use crate::export::ExportFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How input tables are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeType {
    /// Stack rows, unioning columns by name
    #[default]
    Concatenate,
    /// Full outer join on a key column
    Join,
}

/// What to do with same-named columns left over after a join
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateColumnStrategy {
    /// Keep every column, suffixing later occurrences with `_1`, `_2`, ...
    #[default]
    KeepAll,
    /// Keep the left-most occurrence
    First,
    /// Keep the right-most occurrence
    Last,
    /// Fold all occurrences into one `" | "`-joined column
    Merge,
}

/// Missing-value policy applied to each table before combination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDataStrategy {
    #[default]
    Keep,
    Drop,
    Zero,
    Na,
    Ffill,
    Bfill,
}

/// Which occurrence of a duplicated row survives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateRowKeep {
    #[default]
    First,
    Last,
}

/// Final ordering of the merged rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    None,
    /// Sort by the first column whose name contains "date" or "time"
    Date,
    /// Sort by `sort_column`
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl fmt::Display for DuplicateColumnStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DuplicateColumnStrategy::KeepAll => "keep_all",
            DuplicateColumnStrategy::First => "first",
            DuplicateColumnStrategy::Last => "last",
            DuplicateColumnStrategy::Merge => "merge",
        })
    }
}

impl fmt::Display for MissingDataStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissingDataStrategy::Keep => "keep",
            MissingDataStrategy::Drop => "drop",
            MissingDataStrategy::Zero => "zero",
            MissingDataStrategy::Na => "na",
            MissingDataStrategy::Ffill => "ffill",
            MissingDataStrategy::Bfill => "bfill",
        })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        })
    }
}

/// Comparison used by a filter rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "contains")]
    Contains,
}

impl FilterOperator {
    /// Symbol used in configuration and log output
    pub fn symbol(self) -> &'static str {
        match self {
            FilterOperator::Eq => "==",
            FilterOperator::Ne => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Lt => "<",
            FilterOperator::Ge => ">=",
            FilterOperator::Le => "<=",
            FilterOperator::Contains => "contains",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single row filter: `column operator value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterRule {
    /// Create a new filter rule
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.operator, self.value)
    }
}

impl FromStr for FilterRule {
    type Err = String;

    /// Parse `"amount>=100"`, `"city == Oslo"` or `"name contains an"`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Two-character operators first so ">=" is not read as ">"
        const OPERATORS: &[(&str, FilterOperator)] = &[
            (" contains ", FilterOperator::Contains),
            ("==", FilterOperator::Eq),
            ("!=", FilterOperator::Ne),
            (">=", FilterOperator::Ge),
            ("<=", FilterOperator::Le),
            (">", FilterOperator::Gt),
            ("<", FilterOperator::Lt),
        ];

        for (token, operator) in OPERATORS {
            if let Some((column, value)) = s.split_once(token) {
                let column = column.trim();
                if column.is_empty() {
                    return Err(format!("missing column name in filter '{}'", s));
                }
                return Ok(FilterRule::new(column, *operator, value.trim()));
            }
        }

        Err(format!(
            "invalid filter '{}', expected 'column OP value' with OP one of ==, !=, >, <, >=, <=, contains",
            s
        ))
    }
}

/// Every option the merge pipeline understands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeConfig {
    pub merge_type: MergeType,
    pub join_key_left: Option<String>,
    pub join_key_right: Option<String>,
    pub duplicate_column_strategy: DuplicateColumnStrategy,
    /// Table identity (source path as given) -> columns to retain
    pub column_selection: BTreeMap<String, Vec<String>>,
    /// Original column name -> replacement name
    pub column_mapping: BTreeMap<String, String>,
    pub filters: Vec<FilterRule>,
    pub missing_data_strategy: MissingDataStrategy,
    pub remove_duplicate_rows: bool,
    pub duplicate_row_keep: DuplicateRowKeep,
    pub sort_option: SortOption,
    pub sort_column: Option<String>,
    pub sort_order: SortOrder,
}

impl MergeConfig {
    /// Load a configuration from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the configuration to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Columns to retain for a table, if a non-empty selection is configured
    pub fn selection_for(&self, source: &Path) -> Option<&[String]> {
        let key = source.to_string_lossy();
        self.column_selection
            .get(key.as_ref())
            .map(Vec::as_slice)
            .filter(|cols| !cols.is_empty())
    }
}

/// One merge job inside a batch file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    /// Optional label shown in batch output
    #[serde(default)]
    pub name: Option<String>,
    /// Input files, in merge order
    pub files: Vec<PathBuf>,
    /// Output file path
    pub output: PathBuf,
    /// Output format; inferred from the output extension when absent
    #[serde(default)]
    pub format: Option<ExportFormat>,
    /// Pipeline options for this job
    #[serde(default)]
    pub config: MergeConfig,
}

/// A batch file containing multiple merge jobs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchFile {
    pub jobs: Vec<BatchJob>,
}

impl BatchFile {
    /// Load a batch file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the batch file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
