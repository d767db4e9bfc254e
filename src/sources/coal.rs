//! Daily Rotterdam coal price from the market-data spreadsheet.
//!
//! The workbook (`.xls`, `.xlsx`, ...) is read directly; any other extension
//! is taken to be a CSV export of the same sheet.

use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::files::{display_name, header_map, open_csv, parse_optional_f64, record_line, require_column};
use crate::domain::TimeSeries;
use crate::error::{PipelineError, Result};

pub const COAL_PRICE_COLUMN: &str = "coal_price";

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xls", "xlsx", "xlsm", "xlsb", "ods"];

type CoalPoints = Vec<(NaiveDateTime, Option<f64>)>;

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

#[derive(Debug, Clone)]
pub struct CoalPriceReader {
    path: PathBuf,
    header_rows: usize,
    value_column: String,
}

impl CoalPriceReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            header_rows: 2,
            value_column: "ROTTERDAM COAL".to_string(),
        }
    }

    /// Title rows above the real header row
    pub fn with_header_rows(mut self, rows: usize) -> Self {
        self.header_rows = rows;
        self
    }

    pub fn with_value_column(mut self, column: impl Into<String>) -> Self {
        self.value_column = column.into();
        self
    }

    /// Chronological daily series keyed at midnight, gaps forward-filled
    pub fn read(&self) -> Result<TimeSeries<Option<f64>>> {
        let points = if is_workbook(&self.path) {
            self.read_workbook()?
        } else {
            self.read_csv()?
        };

        let series = TimeSeries::from_points(COAL_PRICE_COLUMN, points).forward_fill();
        let leading_gaps = series.points().iter().take_while(|(_, v)| v.is_none()).count();
        info!(rows = series.len(), leading_gaps, "read coal price");
        Ok(series)
    }

    /// First sheet of the workbook. Dates sit in column A and may be real
    /// date cells or text labels.
    fn read_workbook(&self) -> Result<CoalPoints> {
        let origin = display_name(&self.path);
        let mut workbook =
            open_workbook_auto(&self.path).map_err(|e| PipelineError::workbook(&self.path, e))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| PipelineError::workbook(&self.path, "workbook has no sheets"))?
            .map_err(|e| PipelineError::workbook(&self.path, e))?;

        // The range starts at the first non-empty row; keep sheet row numbers
        let first_row = range.start().map_or(0, |(row, _)| row as usize);
        let mut rows = range
            .rows()
            .enumerate()
            .map(|(i, cells)| ((first_row + i + 1) as u64, cells))
            .skip(self.header_rows.saturating_sub(first_row));

        let missing = || PipelineError::missing_column(&origin, &self.value_column);
        let (header_line, header) = rows.next().ok_or_else(missing)?;
        let value_idx = header
            .iter()
            .position(|cell| cell.get_string().map(str::trim) == Some(self.value_column.as_str()))
            .ok_or_else(missing)?;
        debug!(header_line, value_idx, "coal workbook header");

        let mut points = Vec::new();
        for (line, cells) in rows {
            let date_cell = cells.first().unwrap_or(&Data::Empty);
            if is_blank(date_cell) {
                continue;
            }
            let date = cell_date(date_cell).ok_or_else(|| {
                PipelineError::parse(&origin, line, format!("invalid date '{date_cell}'"))
            })?;
            let value = cell_value(
                cells.get(value_idx).unwrap_or(&Data::Empty),
                &origin,
                line,
                &self.value_column,
            )?;
            points.push((date, value));
        }
        Ok(points)
    }

    fn read_csv(&self) -> Result<CoalPoints> {
        let origin = display_name(&self.path);
        let mut reader = open_csv(&self.path, self.header_rows)?;
        let headers = header_map(reader.headers()?);
        // The date column has no header in the spreadsheet
        let value_idx = require_column(&headers, &self.value_column, &origin)?;

        let mut points = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record_line(&record);
            let raw_date = record.get(0).unwrap_or_default().trim();
            if raw_date.is_empty() {
                continue;
            }
            let date = parse_coal_date(raw_date).ok_or_else(|| {
                PipelineError::parse(&origin, line, format!("invalid date '{raw_date}'"))
            })?;
            let value = parse_optional_f64(
                record.get(value_idx).unwrap_or_default(),
                &origin,
                line,
                &self.value_column,
            )?;
            points.push((date, value));
        }
        Ok(points)
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_date(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) => parse_coal_date(s),
        other => other.as_datetime(),
    }
}

/// Numeric cell; blanks and spreadsheet error cells (`#N/A`) are no value
fn cell_value(cell: &Data, origin: &str, line: u64, column: &str) -> Result<Option<f64>> {
    match cell {
        Data::Empty | Data::Error(_) => Ok(None),
        Data::Float(v) => Ok(Some(*v)),
        Data::Int(v) => Ok(Some(*v as f64)),
        Data::String(s) => parse_optional_f64(s, origin, line, column),
        other => Err(PipelineError::parse(
            origin,
            line,
            format!("column '{column}': invalid number '{other}'"),
        )),
    }
}

/// Spreadsheet exports mix ISO dates with `25-NOV-15` style labels
pub fn parse_coal_date(raw: &str) -> Option<NaiveDateTime> {
    const DATETIME_FMTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%d-%b-%y", "%d/%m/%Y", "%d.%m.%Y"];

    let raw = raw.trim();
    DATETIME_FMTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FMTS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}
