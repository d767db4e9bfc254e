//! Serialization of the feature table for downstream consumers

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::assembly::FeatureTable;
use crate::domain::OutputFormat;
use crate::error::{PipelineError, Result};

pub const TIME_COLUMN: &str = "time";
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_nan() => "NaN".to_string(),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

/// Header `time,<columns>` then one record per row.
///
/// No-value cells are empty; NaN is written as `NaN`.
pub fn write_csv<W: Write>(table: &FeatureTable, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(std::iter::once(TIME_COLUMN).chain(table.columns().iter().map(String::as_str)))?;
    for (ts, row) in table.iter() {
        let record = std::iter::once(ts.format(TIME_FORMAT).to_string())
            .chain(row.iter().map(|v| format_cell(*v)));
        csv.write_record(record)?;
    }
    csv.flush().map_err(|e| PipelineError::io("<csv output>", e))?;
    Ok(())
}

struct JsonRows<'a>(&'a FeatureTable);

struct JsonRow<'a> {
    time: String,
    columns: &'a [String],
    values: &'a [Option<f64>],
}

impl Serialize for JsonRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for (ts, values) in self.0.iter() {
            seq.serialize_element(&JsonRow {
                time: ts.format(TIME_FORMAT).to_string(),
                columns: self.0.columns(),
                values,
            })?;
        }
        seq.end()
    }
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len() + 1))?;
        map.serialize_entry(TIME_COLUMN, &self.time)?;
        for (column, value) in self.columns.iter().zip(self.values) {
            // JSON has no NaN; non-finite numbers become null
            map.serialize_entry(column, &value.filter(|v| v.is_finite()))?;
        }
        map.end()
    }
}

/// Array of `{ "time": .., <column>: number|null }` objects in column order
pub fn write_json<W: Write>(table: &FeatureTable, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, &JsonRows(table))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| PipelineError::io("<json output>", e))
}

/// Write the table to `path`, creating parent directories as needed
pub fn write_table(table: &FeatureTable, path: &Path, format: OutputFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let writer = BufWriter::new(file);
    match format {
        OutputFormat::Csv => write_csv(table, writer)?,
        OutputFormat::Json => write_json(table, writer)?,
    }
    info!(path = %path.display(), %format, rows = table.len(), "wrote feature table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{assemble, SourceFrame};
    use crate::domain::Frame;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, d)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap()
    }

    fn table() -> FeatureTable {
        let mut a = Frame::new(["price", "wind_share"]);
        a.insert(ts(1), vec![Some(25.5), Some(f64::NAN)]);
        a.insert(ts(2), vec![None, Some(0.25)]);
        assemble(11, vec![SourceFrame::hourly("a", a)]).unwrap()
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        write_csv(&table(), &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "time,price,wind_share\n\
             2020-01-01 11:00:00,25.5,NaN\n\
             2020-01-02 11:00:00,,0.25\n"
        );
    }

    #[test]
    fn test_write_json_preserves_column_order() {
        let mut buf = Vec::new();
        write_json(&table(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["time"], "2020-01-01 11:00:00");
        assert_eq!(value[0]["price"], 25.5);
        assert!(value[0]["wind_share"].is_null());
        assert!(value[1]["price"].is_null());
        assert!(text.find("\"time\"").unwrap() < text.find("\"price\"").unwrap());
        assert!(text.find("\"price\"").unwrap() < text.find("\"wind_share\"").unwrap());
    }

    #[test]
    fn test_write_table_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("features.csv");
        write_table(&table(), &path, OutputFormat::Csv).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("time,price"));
    }
}
