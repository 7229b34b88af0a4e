//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use csvmerge_core::{
    DuplicateColumnStrategy, DuplicateRowKeep, ExportFormat, FilterRule, MergeConfig, MergeType,
    MissingDataStrategy, SortOption, SortOrder,
};

use crate::logging::LogFormat;

#[derive(Parser)]
#[command(name = "csvmerge")]
#[command(about = "Merge, filter and convert CSV files", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Write logs to a file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge files and write the result
    Merge {
        #[command(flatten)]
        merge: MergeArgs,

        /// Output file (default: ./merged_data.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (default: from the output extension, else csv)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Run a merge and print the first rows without writing anything
    Preview {
        #[command(flatten)]
        merge: MergeArgs,

        /// Number of rows to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Show row, column and missing-value counts per input file
    Stats {
        /// Input files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the CSV/TSV files a directory would contribute
    Scan {
        /// Directory to scan
        root: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Run every job in a batch file
    Batch {
        /// Path to batch file (JSON)
        #[arg(short, long)]
        batch: PathBuf,
    },

    /// Write a merge configuration template
    CreateConfig {
        /// Output path for the config file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a batch file template
    CreateBatch {
        /// Output path for the batch file
        #[arg(short, long)]
        output: PathBuf,

        /// Input files for the example job
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// Merged output path for the example job
        #[arg(long, default_value = "merged_data.csv")]
        job_output: PathBuf,
    },
}

/// Inputs and merge options shared by `merge` and `preview`
///
/// Flags override values loaded from `--config`.
#[derive(Args)]
pub struct MergeArgs {
    /// Input files or directories, merged in the order given
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Descend into subdirectories of directory inputs
    #[arg(short, long)]
    pub recursive: bool,

    /// Merge configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// How tables are combined
    #[arg(long, value_enum)]
    pub merge_type: Option<MergeTypeArg>,

    /// Join key column on the accumulated side
    #[arg(long)]
    pub left_key: Option<String>,

    /// Join key column on the incoming side (default: same as --left-key)
    #[arg(long)]
    pub right_key: Option<String>,

    /// Resolution for duplicate column names after a join
    #[arg(long, value_enum)]
    pub duplicate_columns: Option<DuplicateColumnsArg>,

    /// Keep only these columns of one file (FILE=COL,COL,...)
    #[arg(long, value_name = "FILE=COLUMNS", value_parser = parse_key_value)]
    pub select: Vec<(String, String)>,

    /// Rename a column in every file (OLD=NEW)
    #[arg(long, value_name = "OLD=NEW", value_parser = parse_key_value)]
    pub rename: Vec<(String, String)>,

    /// Row filter such as "amount>=100" or "city contains York"
    #[arg(long = "filter", value_name = "RULE")]
    pub filters: Vec<FilterRule>,

    /// Missing-value handling per input table
    #[arg(long, value_enum)]
    pub missing: Option<MissingArg>,

    /// Remove duplicate rows after combining
    #[arg(long)]
    pub dedup: bool,

    /// Which duplicate row survives
    #[arg(long, value_enum)]
    pub keep: Option<KeepArg>,

    /// Final row ordering
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// Column for --sort custom
    #[arg(long)]
    pub sort_column: Option<String>,

    /// Sort descending (custom sort only)
    #[arg(long)]
    pub descending: bool,
}

impl MergeArgs {
    /// Start from the config file (or defaults) and apply flag overrides
    pub fn to_config(&self) -> csvmerge_core::Result<MergeConfig> {
        let mut config = match &self.config {
            Some(path) => MergeConfig::load(path)?,
            None => MergeConfig::default(),
        };

        if let Some(merge_type) = self.merge_type {
            config.merge_type = merge_type.into();
        }
        if let Some(left) = &self.left_key {
            config.join_key_left = Some(left.clone());
            if self.right_key.is_none() && config.join_key_right.is_none() {
                config.join_key_right = Some(left.clone());
            }
        }
        if let Some(right) = &self.right_key {
            config.join_key_right = Some(right.clone());
        }
        if let Some(strategy) = self.duplicate_columns {
            config.duplicate_column_strategy = strategy.into();
        }
        for (file, columns) in &self.select {
            let columns = columns
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
            config.column_selection.insert(file.clone(), columns);
        }
        for (old, new) in &self.rename {
            config.column_mapping.insert(old.clone(), new.clone());
        }
        config.filters.extend(self.filters.iter().cloned());
        if let Some(missing) = self.missing {
            config.missing_data_strategy = missing.into();
        }
        if self.dedup {
            config.remove_duplicate_rows = true;
        }
        if let Some(keep) = self.keep {
            config.duplicate_row_keep = keep.into();
        }
        if let Some(sort) = self.sort {
            config.sort_option = sort.into();
        }
        if let Some(column) = &self.sort_column {
            config.sort_column = Some(column.clone());
            if self.sort.is_none() {
                config.sort_option = SortOption::Custom;
            }
        }
        if self.descending {
            config.sort_order = SortOrder::Descending;
        }

        Ok(config)
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MergeTypeArg {
    Concatenate,
    Join,
}

impl From<MergeTypeArg> for MergeType {
    fn from(arg: MergeTypeArg) -> Self {
        match arg {
            MergeTypeArg::Concatenate => MergeType::Concatenate,
            MergeTypeArg::Join => MergeType::Join,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DuplicateColumnsArg {
    KeepAll,
    First,
    Last,
    Merge,
}

impl From<DuplicateColumnsArg> for DuplicateColumnStrategy {
    fn from(arg: DuplicateColumnsArg) -> Self {
        match arg {
            DuplicateColumnsArg::KeepAll => DuplicateColumnStrategy::KeepAll,
            DuplicateColumnsArg::First => DuplicateColumnStrategy::First,
            DuplicateColumnsArg::Last => DuplicateColumnStrategy::Last,
            DuplicateColumnsArg::Merge => DuplicateColumnStrategy::Merge,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MissingArg {
    Keep,
    Drop,
    Zero,
    Na,
    Ffill,
    Bfill,
}

impl From<MissingArg> for MissingDataStrategy {
    fn from(arg: MissingArg) -> Self {
        match arg {
            MissingArg::Keep => MissingDataStrategy::Keep,
            MissingArg::Drop => MissingDataStrategy::Drop,
            MissingArg::Zero => MissingDataStrategy::Zero,
            MissingArg::Na => MissingDataStrategy::Na,
            MissingArg::Ffill => MissingDataStrategy::Ffill,
            MissingArg::Bfill => MissingDataStrategy::Bfill,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KeepArg {
    First,
    Last,
}

impl From<KeepArg> for DuplicateRowKeep {
    fn from(arg: KeepArg) -> Self {
        match arg {
            KeepArg::First => DuplicateRowKeep::First,
            KeepArg::Last => DuplicateRowKeep::Last,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SortArg {
    None,
    Date,
    Custom,
}

impl From<SortArg> for SortOption {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::None => SortOption::None,
            SortArg::Date => SortOption::Date,
            SortArg::Custom => SortOption::Custom,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Csv,
    Tsv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Tsv => ExportFormat::Tsv,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> MergeArgs {
        let mut argv = vec!["csvmerge", "preview"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Preview { merge, .. } => merge,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_flags_build_config() {
        let args = parse(&[
            "a.csv",
            "b.csv",
            "--merge-type",
            "join",
            "--left-key",
            "id",
            "--duplicate-columns",
            "merge",
            "--filter",
            "amount>=100",
            "--rename",
            "amt=amount",
            "--select",
            "a.csv=id, amount",
            "--sort-column",
            "amount",
            "--descending",
        ]);
        let config = args.to_config().unwrap();

        assert_eq!(config.merge_type, MergeType::Join);
        assert_eq!(config.join_key_left.as_deref(), Some("id"));
        assert_eq!(config.join_key_right.as_deref(), Some("id"));
        assert_eq!(config.duplicate_column_strategy, DuplicateColumnStrategy::Merge);
        assert_eq!(config.filters.len(), 1);
        assert_eq!(config.column_mapping["amt"], "amount");
        assert_eq!(config.column_selection["a.csv"], vec!["id", "amount"]);
        assert_eq!(config.sort_option, SortOption::Custom);
        assert_eq!(config.sort_order, SortOrder::Descending);
    }

    #[test]
    fn test_defaults_without_flags() {
        let config = parse(&["a.csv"]).to_config().unwrap();
        assert_eq!(config.merge_type, MergeType::Concatenate);
        assert_eq!(config.sort_option, SortOption::None);
        assert!(config.filters.is_empty());
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("old = new").unwrap(),
            ("old".to_string(), "new".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
