//! Loader for delimited table files

use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Row, Table};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Pick the field delimiter from a file extension (`.tsv`/`.tab` are tab-separated)
pub fn delimiter_for_path(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    }
}

/// Parse a CSV or TSV file into a Table, choosing the delimiter from the extension
pub fn parse_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    parse_delimited(path, delimiter_for_path(path))
}

/// Parse a delimited file into a Table
pub fn parse_delimited<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Table> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let content = strip_bom(&bytes, path)?;
    let table = read_table(content, path.to_path_buf(), delimiter)?;
    debug!(
        path = %path.display(),
        rows = table.row_count(),
        columns = table.column_count(),
        "parsed table"
    );
    Ok(table)
}

/// Parse CSV from a string (useful for testing)
pub fn parse_csv_str(content: &str, source_name: &str) -> Result<Table> {
    read_table(content.as_bytes(), PathBuf::from(source_name), b',')
}

/// Drop a UTF-8 byte order mark and reject UTF-16 ones
fn strip_bom<'a>(bytes: &'a [u8], path: &Path) -> Result<&'a [u8]> {
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Err(Error::UnsupportedEncoding {
            path: path.to_path_buf(),
            encoding: "UTF-16 LE",
        });
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Err(Error::UnsupportedEncoding {
            path: path.to_path_buf(),
            encoding: "UTF-16 BE",
        });
    }
    Ok(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes))
}

fn read_table(content: &[u8], path: PathBuf, delimiter: u8) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true) // Allow varying number of fields
        .from_reader(content);

    // Parse headers into columns
    let headers = csv_reader.headers().map_err(|e| Error::Csv {
        path: path.clone(),
        source: e,
    })?;

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| Column::new(name.trim().to_string(), i))
        .collect();

    if columns.is_empty() || columns.iter().all(|c| c.name.is_empty()) {
        return Err(Error::CsvParse {
            path,
            message: "no columns found in header".to_string(),
        });
    }

    // Parse rows
    let mut rows = Vec::new();
    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.clone(),
            source: e,
        })?;

        let mut cells: Vec<CellValue> = record.iter().map(CellValue::parse).collect();

        // Pad with missing cells if row is shorter than header
        if cells.len() < columns.len() {
            cells.resize(columns.len(), CellValue::Missing);
        }

        // Warn if row is longer than header (truncate)
        if cells.len() > columns.len() {
            warn!(
                row = row_idx + 1,
                path = %path.display(),
                "row has more cells than columns, truncating"
            );
            cells.truncate(columns.len());
        }

        rows.push(Row::new(cells));
    }

    Ok(Table {
        columns,
        rows,
        source_path: path,
    })
}
