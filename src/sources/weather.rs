//! Historical hourly weather per city (bulk export, one row per city and hour)

use chrono::{DateTime, Duration, NaiveDateTime};
use std::path::PathBuf;
use strum::IntoEnumIterator;
use tracing::info;

use super::files::{display_name, header_map, open_csv, parse_optional_f64, record_line, require_column};
use crate::domain::WeatherMetric;
use crate::dst::STANDARD_TIME_UTC_OFFSET_HOURS;
use crate::error::{PipelineError, Result};

/// Population of each city present in the weather export
pub const CITY_POPULATION: [(&str, u32); 11] = [
    ("Aarhus", 349_983),
    ("Odense", 204_895),
    ("Aalborg", 217_075),
    ("Esbjerg", 115_748),
    ("Vejle", 111_743),
    ("Randers", 96_559),
    ("Viborg", 93_819),
    ("Kolding", 89_412),
    ("Silkeborg", 89_328),
    ("Herning", 86_348),
    ("Horsens", 83_598),
];

pub fn city_population(city: &str) -> Option<u32> {
    CITY_POPULATION
        .iter()
        .find(|(name, _)| *name == city)
        .map(|(_, pop)| *pop)
}

/// One city's reading at one hour, weighted by the city's population
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedObservation {
    pub city: String,
    pub timestamp: NaiveDateTime,
    /// Indexed by [`WeatherMetric::index`]
    pub values: [Option<f64>; WeatherMetric::COUNT],
    pub weight: f64,
}

impl WeightedObservation {
    pub fn value(&self, metric: WeatherMetric) -> Option<f64> {
        self.values[metric.index()]
    }
}

#[derive(Debug, Clone)]
pub struct WeatherReader {
    path: PathBuf,
    utc_offset_hours: i64,
}

impl WeatherReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            utc_offset_hours: STANDARD_TIME_UTC_OFFSET_HOURS,
        }
    }

    /// Shift applied to the UTC `dt` column to land on the pipeline clock
    /// (default +1, the standard-time clock of the realigned market series)
    pub fn with_utc_offset_hours(mut self, hours: i64) -> Self {
        self.utc_offset_hours = hours;
        self
    }

    pub fn read(&self) -> Result<Vec<WeightedObservation>> {
        let origin = display_name(&self.path);
        let mut reader = open_csv(&self.path, 0)?;
        let headers = header_map(reader.headers()?);

        // Everything else in the export (coordinates, pressure, rain, snow,
        // icon codes, ...) is ignored.
        let dt_idx = require_column(&headers, "dt", &origin)?;
        let city_idx = require_column(&headers, "city_name", &origin)?;
        let metric_idx = WeatherMetric::iter()
            .map(|m| require_column(&headers, m.column(), &origin))
            .collect::<Result<Vec<_>>>()?;

        let offset = Duration::hours(self.utc_offset_hours);
        let mut observations = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record_line(&record);

            let city = record.get(city_idx).unwrap_or_default().trim();
            let weight = city_population(city).ok_or_else(|| PipelineError::UnknownCity {
                city: city.to_string(),
            })?;

            let raw_dt = record.get(dt_idx).unwrap_or_default();
            let timestamp = parse_weather_timestamp(raw_dt).ok_or_else(|| {
                PipelineError::parse(&origin, line, format!("invalid dt '{raw_dt}'"))
            })? + offset;

            let mut values = [None; WeatherMetric::COUNT];
            for (metric, idx) in WeatherMetric::iter().zip(&metric_idx) {
                values[metric.index()] = parse_optional_f64(
                    record.get(*idx).unwrap_or_default(),
                    &origin,
                    line,
                    metric.column(),
                )?;
            }

            observations.push(WeightedObservation {
                city: city.to_string(),
                timestamp,
                values,
                weight: weight as f64,
            });
        }

        info!(rows = observations.len(), "read weather observations");
        Ok(observations)
    }
}

/// `dt` is Unix seconds in the bulk export; ISO-like datetimes are accepted too.
pub fn parse_weather_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }
    // `2015-01-01 00:00:00 +0000 UTC` style labels carry a zone suffix
    let head = raw.get(..19).unwrap_or(raw);
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(head, fmt).ok())
}
