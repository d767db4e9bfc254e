//! Shared plumbing for the delimited-text readers

use csv::{ReaderBuilder, StringRecord, Trim};
use itertools::Itertools;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// All `*.csv` files directly inside `dir`, in file-name order
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PipelineError::io(dir, e))?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(PipelineError::NoInputFiles {
            dir: dir.to_path_buf(),
        });
    }
    Ok(files.into_iter().sorted().collect())
}

/// Open a headed CSV file, optionally skipping leading non-CSV lines
pub fn open_csv(path: &Path, skip_lines: usize) -> Result<csv::Reader<Box<dyn Read>>> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut discard = String::new();
    for _ in 0..skip_lines {
        discard.clear();
        if reader
            .read_line(&mut discard)
            .map_err(|e| PipelineError::io(path, e))?
            == 0
        {
            break;
        }
    }
    let inner: Box<dyn Read> = Box::new(reader);
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(inner))
}

/// Header name -> column index
pub fn header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_string(), i))
        .collect()
}

/// Index of a required column, or `MissingColumn`
pub fn require_column(
    headers: &HashMap<String, usize>,
    name: &str,
    origin: &str,
) -> Result<usize> {
    headers
        .get(name)
        .copied()
        .ok_or_else(|| PipelineError::missing_column(origin, name))
}

/// 1-based line of a record, for error messages
pub fn record_line(record: &StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

/// Parse a numeric cell; empty cells are `None`
pub fn parse_optional_f64(cell: &str, origin: &str, line: u64, column: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some).map_err(|_| {
        PipelineError::parse(origin, line, format!("column '{column}': invalid number '{cell}'"))
    })
}

pub fn display_name(path: &Path) -> String {
    path.display().to_string()
}
