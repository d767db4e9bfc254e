//! Readers for the hourly market series (day-ahead price, actual load).
//!
//! Both sources are exported as one CSV file per year with a
//! `dd.mm.yyyy HH:MM - dd.mm.yyyy HH:MM` interval label in the first column
//! and `-` in place of values that were not published yet.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::files::{display_name, list_csv_files, open_csv, record_line};
use crate::domain::WallClockSeries;
use crate::error::{PipelineError, Result};

const TIMESTAMP_PREFIX_LEN: usize = 16;
const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Reads every CSV file of one market series from a directory
#[derive(Debug, Clone)]
pub struct MarketSeriesReader {
    name: String,
    dir: PathBuf,
    value_column: usize,
    missing_marker: String,
}

impl MarketSeriesReader {
    /// Reader for `name` with values in column 1 and `-` as the missing marker
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            value_column: 1,
            missing_marker: "-".to_string(),
        }
    }

    /// Zero-based index of the value column
    pub fn with_value_column(mut self, index: usize) -> Self {
        self.value_column = index;
        self
    }

    pub fn with_missing_marker(mut self, marker: impl Into<String>) -> Self {
        self.missing_marker = marker.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concatenate all files of the series into wall-clock readings
    pub fn read(&self) -> Result<WallClockSeries> {
        let files = list_csv_files(&self.dir)?;
        let mut readings = Vec::new();
        let mut dropped = 0usize;
        for path in &files {
            dropped += self.read_file(path, &mut readings)?;
        }
        info!(
            series = %self.name,
            files = files.len(),
            rows = readings.len(),
            missing = dropped,
            "read market series"
        );
        Ok(WallClockSeries::new(self.name.clone(), readings))
    }

    /// Append the readings of one file; returns how many sentinel rows were dropped
    fn read_file(&self, path: &Path, out: &mut Vec<(NaiveDateTime, f64)>) -> Result<usize> {
        let origin = display_name(path);
        let mut reader = open_csv(path, 0)?;
        let width = reader.headers()?.len();
        if width <= self.value_column {
            return Err(PipelineError::missing_column(
                origin,
                format!("#{}", self.value_column),
            ));
        }

        let mut dropped = 0usize;
        for record in reader.records() {
            let record = record?;
            let line = record_line(&record);
            let raw_value = record.get(self.value_column).unwrap_or_default().trim();
            if raw_value == self.missing_marker {
                dropped += 1;
                continue;
            }

            let raw_time = record.get(0).unwrap_or_default();
            let ts = parse_market_timestamp(raw_time).ok_or_else(|| {
                PipelineError::parse(&origin, line, format!("invalid timestamp '{raw_time}'"))
            })?;
            let value = raw_value.parse::<f64>().map_err(|_| {
                PipelineError::parse(&origin, line, format!("invalid value '{raw_value}'"))
            })?;
            out.push((ts, value));
        }
        debug!(file = %origin, dropped, "parsed market file");
        Ok(dropped)
    }
}

/// Parse the leading `dd.mm.yyyy HH:MM` of an interval label
pub fn parse_market_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let prefix = raw.trim().get(..TIMESTAMP_PREFIX_LEN)?;
    NaiveDateTime::parse_from_str(prefix, TIMESTAMP_FORMAT).ok()
}
