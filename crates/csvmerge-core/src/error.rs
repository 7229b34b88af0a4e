//! Error types for csvmerge-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in csvmerge-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a delimited file
    #[error("failed to parse CSV '{path}': {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Failed to write delimited output
    #[error("CSV write error: {0}")]
    CsvWrite(#[from] csv::Error),

    /// The file starts with a byte order mark we cannot decode
    #[error("unsupported encoding {encoding} in '{path}'")]
    UnsupportedEncoding {
        path: PathBuf,
        encoding: &'static str,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// A column referenced by configuration does not exist
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// A filter rule could not be evaluated
    #[error("filter on '{column}' failed: {message}")]
    Filter { column: String, message: String },

    /// Two tables could not be joined
    #[error("cannot join: {0}")]
    Join(String),

    /// A column holds values that cannot be ordered against each other
    #[error("column '{0}' mixes numeric and text values")]
    Unorderable(String),

    /// A row does not have one cell per column
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Nothing left to merge
    #[error("no tables available to merge")]
    NoTables,

    /// The caller cancelled the run
    #[error("merge cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
