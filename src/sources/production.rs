//! Hourly production/consumption settlement table (one column per technology)

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use super::files::{display_name, header_map, open_csv, parse_optional_f64, record_line, require_column};
use crate::error::{PipelineError, Result};

/// Wind technologies summed into `wind_prod`
pub const WIND_COLUMNS: [&str; 4] = [
    "OffshoreWindLt100MW_MWh",
    "OffshoreWindGe100MW_MWh",
    "OnshoreWindLt50kW_MWh",
    "OnshoreWindGe50kW_MWh",
];

/// Non-wind technologies added to `total_prod`
pub const NON_WIND_COLUMNS: [&str; 7] = [
    "CentralPowerMWh",
    "LocalPowerMWh",
    "HydroPowerMWh",
    "SolarPowerLt10kW_MWh",
    "SolarPowerGe10Lt40kW_MWh",
    "SolarPowerGe40kW_MWh",
    "TransmissionLossMWh",
];

/// Solar self-consumption, subtracted from `total_prod`
pub const SELF_CONSUMPTION_COLUMN: &str = "SolarPowerSelfConMWh";

/// Columns that are legitimately empty in parts of the history
pub const PARTIALLY_NULL_COLUMNS: [&str; 5] = [
    "SolarPowerGe10Lt40kW_MWh",
    "SolarPowerGe40kW_MWh",
    "SolarPowerLt10kW_MWh",
    "TransmissionLossMWh",
    SELF_CONSUMPTION_COLUMN,
];

pub fn required_columns() -> impl Iterator<Item = &'static str> {
    WIND_COLUMNS
        .into_iter()
        .chain(NON_WIND_COLUMNS)
        .chain(std::iter::once(SELF_CONSUMPTION_COLUMN))
}

/// Wide table of raw per-technology production, sorted by timestamp
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductionTable {
    pub origin: String,
    pub timestamps: Vec<NaiveDateTime>,
    pub columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl ProductionTable {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone)]
pub struct ProductionReader {
    path: PathBuf,
    timestamp_column: String,
    price_area: Option<String>,
    start: Option<NaiveDateTime>,
}

impl ProductionReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timestamp_column: "HourDK".to_string(),
            price_area: None,
            start: None,
        }
    }

    pub fn with_timestamp_column(mut self, column: impl Into<String>) -> Self {
        self.timestamp_column = column.into();
        self
    }

    /// Keep only rows of one bidding zone when the file has a `PriceArea` column
    pub fn with_price_area(mut self, area: Option<String>) -> Self {
        self.price_area = area;
        self
    }

    /// Drop rows before `start`
    pub fn with_start(mut self, start: NaiveDateTime) -> Self {
        self.start = Some(start);
        self
    }

    pub fn read(&self) -> Result<ProductionTable> {
        let origin = display_name(&self.path);
        let mut reader = open_csv(&self.path, 0)?;
        let headers = header_map(reader.headers()?);

        let ts_idx = require_column(&headers, &self.timestamp_column, &origin)?;
        let area_idx = headers.get("PriceArea").copied();
        let wanted = required_columns()
            .map(|name| require_column(&headers, name, &origin).map(|idx| (name, idx)))
            .collect::<Result<Vec<_>>>()?;

        let mut rows: Vec<(NaiveDateTime, Vec<Option<f64>>)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record_line(&record);

            if let (Some(area), Some(idx)) = (&self.price_area, area_idx) {
                if record.get(idx).map(str::trim) != Some(area.as_str()) {
                    continue;
                }
            }

            let raw_ts = record.get(ts_idx).unwrap_or_default();
            let ts = parse_production_timestamp(raw_ts).ok_or_else(|| {
                PipelineError::parse(&origin, line, format!("invalid timestamp '{raw_ts}'"))
            })?;
            if self.start.map_or(false, |start| ts < start) {
                continue;
            }

            let values = wanted
                .iter()
                .map(|(name, idx)| {
                    parse_optional_f64(record.get(*idx).unwrap_or_default(), &origin, line, name)
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push((ts, values));
        }

        // Stable: of two rows for the repeated local hour, the first is kept
        rows.sort_by_key(|(ts, _)| *ts);
        let before = rows.len();
        rows.dedup_by_key(|(ts, _)| *ts);
        if rows.len() != before {
            debug!(duplicates = before - rows.len(), "dropped duplicate production hours");
        }

        let mut table = ProductionTable {
            origin,
            timestamps: Vec::with_capacity(rows.len()),
            columns: wanted
                .iter()
                .map(|(name, _)| (name.to_string(), Vec::with_capacity(rows.len())))
                .collect(),
        };
        for (ts, values) in rows {
            table.timestamps.push(ts);
            for ((name, _), value) in wanted.iter().zip(values) {
                if let Some(column) = table.columns.get_mut(*name) {
                    column.push(value);
                }
            }
        }

        info!(rows = table.len(), "read production table");
        Ok(table)
    }
}

/// `2015-01-01T00:00:00` or `2015-01-01 00:00:00`
pub fn parse_production_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let normalized = raw.trim().replace('T', " ");
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use itertools::Itertools;
    use std::fs;
    use tempfile::tempdir;

    fn header() -> String {
        ["HourUTC", "HourDK", "PriceArea", "GrossConsumptionMWh"]
            .into_iter()
            .chain(required_columns())
            .join(",")
    }

    /// One CSV row; `values` follows `required_columns()` order
    fn row(hour_dk: &str, area: &str, values: &[&str]) -> String {
        assert_eq!(values.len(), 12);
        format!("{hour_dk},{hour_dk},{area},0,{}", values.join(","))
    }

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    const FULL: [&str; 12] = ["1", "2", "3", "4", "10", "20", "0", "", "", "", "1", ""];

    #[test]
    fn test_parse_production_timestamp() {
        assert_eq!(parse_production_timestamp("2015-01-01T05:00:00"), Some(ts(5)));
        assert_eq!(parse_production_timestamp("2015-01-01 05:00"), Some(ts(5)));
        assert_eq!(parse_production_timestamp("01.01.2015 05:00"), None);
    }

    #[test]
    fn test_read_filters_area_and_start() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prod.csv");
        let lines = [
            header(),
            row("2014-12-31T23:00:00", "DK1", &FULL),
            row("2015-01-01T01:00:00", "DK1", &FULL),
            row("2015-01-01T00:00:00", "DK1", &FULL),
            row("2015-01-01T00:00:00", "DK2", &FULL),
        ];
        fs::write(&path, lines.join("\n")).unwrap();

        let table = ProductionReader::new(&path)
            .with_price_area(Some("DK1".into()))
            .with_start(ts(0))
            .read()
            .unwrap();
        assert_eq!(table.timestamps, vec![ts(0), ts(1)]);
        assert_eq!(table.column("CentralPowerMWh").unwrap(), &[Some(10.0), Some(10.0)]);
        assert_eq!(table.column("SolarPowerLt10kW_MWh").unwrap(), &[None, None]);
    }

    #[test]
    fn test_missing_required_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prod.csv");
        fs::write(&path, "HourUTC,HourDK,CentralPowerMWh\n").unwrap();

        let err = ProductionReader::new(&path).read().unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { at: None, .. }));
    }

    #[test]
    fn test_duplicate_local_hour_keeps_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prod.csv");
        let mut second = FULL;
        second[4] = "99";
        let lines = [
            header(),
            row("2015-01-01T00:00:00", "DK1", &FULL),
            row("2015-01-01T00:00:00", "DK1", &second),
        ];
        fs::write(&path, lines.join("\n")).unwrap();

        let table = ProductionReader::new(&path).read().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column("CentralPowerMWh").unwrap(), &[Some(10.0)]);
    }
}
