//! Directory scanner for discovering delimited table files

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Extensions recognised as delimited tables
const TABLE_EXTENSIONS: &[&str] = &["csv", "tsv", "tab"];

/// Check whether a path looks like a delimited table file
pub fn is_table_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            TABLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// List table files under a directory, sorted by path
///
/// Only the top level is scanned unless `recursive` is set. Unreadable
/// entries below the root are skipped; an unreadable root is an error.
pub fn scan_directory<P: AsRef<Path>>(root: P, recursive: bool) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_file() && is_table_file(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Expand a mix of files and directories into a flat list of table files
///
/// Files are kept in the order given; each directory contributes its own
/// sorted listing at the position it appears.
pub fn expand_inputs<P: AsRef<Path>>(inputs: &[P], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if input.is_dir() {
            files.extend(scan_directory(input, recursive)?);
        } else {
            files.push(input.to_path_buf());
        }
    }
    Ok(files)
}
