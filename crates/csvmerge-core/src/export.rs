//! Writers for merged tables

use crate::error::Result;
use crate::table::{CellValue, Column, Row, Table};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Supported output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
    /// Array of objects, one per row
    Json,
}

impl ExportFormat {
    /// File extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }

    /// Guess the format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "tsv" | "tab" => Some(ExportFormat::Tsv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

/// Append the format's extension unless the name already ends with it
pub fn output_path(dir: &Path, file_name: &str, format: ExportFormat) -> PathBuf {
    let suffix = format!(".{}", format.extension());
    if file_name.to_ascii_lowercase().ends_with(&suffix) {
        dir.join(file_name)
    } else {
        dir.join(format!("{}{}", file_name, suffix))
    }
}

/// Write a table to a file, creating parent directories as needed
pub fn export_table<P: AsRef<Path>>(table: &Table, path: P, format: ExportFormat) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    match format {
        ExportFormat::Csv => write_delimited(table, &mut writer, b',')?,
        ExportFormat::Tsv => write_delimited(table, &mut writer, b'\t')?,
        ExportFormat::Json => write_json_records(table, &mut writer)?,
    }
    writer.flush()?;

    info!(
        path = %path.display(),
        rows = table.row_count(),
        format = format.extension(),
        "exported table"
    );
    Ok(())
}

/// Write header and rows with the given delimiter; missing cells are empty fields
pub fn write_delimited<W: Write>(table: &Table, writer: W, delimiter: u8) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    csv_writer.write_record(table.columns.iter().map(|c| c.name.as_str()))?;
    for row in &table.rows {
        csv_writer.write_record(row.cells.iter().map(CellValue::to_string_value))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write rows as a JSON array of objects, keys in column order
pub fn write_json_records<W: Write>(table: &Table, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, &Records(table))?;
    Ok(())
}

struct Records<'a>(&'a Table);

struct Record<'a> {
    columns: &'a [Column],
    row: &'a Row,
}

struct JsonCell<'a>(&'a CellValue);

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.rows.len()))?;
        for row in &self.0.rows {
            seq.serialize_element(&Record {
                columns: &self.0.columns,
                row,
            })?;
        }
        seq.end()
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for col in self.columns {
            let cell = self.row.get(col.index).unwrap_or(&CellValue::Missing);
            map.serialize_entry(&col.name, &JsonCell(cell))?;
        }
        map.end()
    }
}

impl Serialize for JsonCell<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            CellValue::Integer(i) => serializer.serialize_i64(*i),
            CellValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            CellValue::Float(_) | CellValue::Missing => serializer.serialize_none(),
            CellValue::String(s) => serializer.serialize_str(s),
            CellValue::Date(d) => {
                serializer.collect_str(&d.format("%Y-%m-%dT%H:%M:%S%.3f"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    #[test]
    fn test_output_path_adds_extension_once() {
        let dir = Path::new("out");
        assert_eq!(
            output_path(dir, "merged_data", ExportFormat::Csv),
            PathBuf::from("out/merged_data.csv")
        );
        assert_eq!(
            output_path(dir, "merged_data.json", ExportFormat::Json),
            PathBuf::from("out/merged_data.json")
        );
        assert_eq!(
            output_path(dir, "merged_data.csv", ExportFormat::Tsv),
            PathBuf::from("out/merged_data.csv.tsv")
        );
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("a.JSON")), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_path(Path::new("a.tsv")), Some(ExportFormat::Tsv));
        assert_eq!(ExportFormat::from_path(Path::new("a.xlsx")), None);
    }

    #[test]
    fn test_write_delimited_quotes_and_missing() {
        let table = parse_csv_str("name,note\n\"Smith, J\",\nDoe,ok\n", "t.csv").unwrap();
        let mut out = Vec::new();
        write_delimited(&table, &mut out, b',').unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "name,note\n\"Smith, J\",\nDoe,ok\n");
    }

    #[test]
    fn test_write_tsv() {
        let table = parse_csv_str("a,b\n1,x\n", "t.csv").unwrap();
        let mut out = Vec::new();
        write_delimited(&table, &mut out, b'\t').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\tb\n1\tx\n");
    }

    #[test]
    fn test_json_records_keep_column_order_and_types() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let table = Table::from_parts(
            "t.csv",
            ["zeta", "alpha", "when", "gap"],
            vec![vec![
                CellValue::Integer(1),
                CellValue::String("x".to_string()),
                CellValue::Date(date),
                CellValue::Missing,
            ]],
        );

        let mut out = Vec::new();
        write_json_records(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let zeta = text.find("\"zeta\"").unwrap();
        let alpha = text.find("\"alpha\"").unwrap();
        assert!(zeta < alpha);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["zeta"], 1);
        assert_eq!(value[0]["alpha"], "x");
        assert_eq!(value[0]["when"], "2024-01-05T00:00:00.000");
        assert!(value[0]["gap"].is_null());
    }

    #[test]
    fn test_export_table_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let table = parse_csv_str("a\n1\n", "t.csv").unwrap();

        export_table(&table, &path, ExportFormat::Csv).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n1\n");
    }
}
