//! End-to-end orchestration: read every source, derive features, assemble.
//!
//! Source loads are independent of each other and only meet in the assembly
//! stage, so with `pipeline.parallel` they run as a rayon fork-join. The
//! sequential path runs them in the same fixed order and produces the same
//! table.

use chrono::NaiveTime;
use std::time::Instant;
use tracing::{info, info_span};

use crate::assembly::{assemble, FeatureTable, SourceFrame};
use crate::config::{Config, MarketSourceConfig};
use crate::domain::{Cadence, Frame};
use crate::dst::{realign, DstBoundaryTable};
use crate::error::Result;
use crate::features::{
    calendar_for, derive_production_features, generate_calendar, holiday_frame, weekday_dummies,
    HolidayCalendar, WeatherAggregator,
};
use crate::sources::{CoalPriceReader, MarketSeriesReader, ProductionReader, WeatherReader};

pub struct Pipeline {
    config: Config,
    calendar: Box<dyn HolidayCalendar>,
    dst_table: DstBoundaryTable,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("calendar", &self.calendar.country())
            .field("dst_table", &self.dst_table)
            .finish()
    }
}

impl Pipeline {
    /// Validates the config and picks the built-in holiday calendar for
    /// `pipeline.country`
    pub fn from_config(config: Config) -> Result<Self> {
        config.check()?;
        let calendar = calendar_for(&config.pipeline.country)?;
        Ok(Self {
            config,
            calendar,
            dst_table: DstBoundaryTable::denmark(),
        })
    }

    /// Replace the holiday calendar
    pub fn with_calendar(mut self, calendar: Box<dyn HolidayCalendar>) -> Self {
        self.calendar = calendar;
        self
    }

    /// Replace the DST transition table used for price and load
    pub fn with_dst_table(mut self, table: DstBoundaryTable) -> Self {
        self.dst_table = table;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(&self) -> Result<FeatureTable> {
        let span = info_span!("pipeline", hour = self.config.pipeline.hour);
        let _guard = span.enter();
        let started = Instant::now();

        let sources = if self.config.pipeline.parallel {
            self.load_parallel()?
        } else {
            self.load_sequential()?
        };

        let table = assemble(self.config.pipeline.hour, sources)?;
        info!(
            rows = table.len(),
            columns = table.columns().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );
        Ok(table)
    }

    fn load_sequential(&self) -> Result<Vec<SourceFrame>> {
        let [holidays, weekdays] = self.calendar_frames();
        Ok(vec![
            self.price_frame()?,
            self.load_frame()?,
            self.coal_frame()?,
            self.weather_frame()?,
            self.production_frame()?,
            holidays,
            weekdays,
        ])
    }

    fn load_parallel(&self) -> Result<Vec<SourceFrame>> {
        let ((price, load), ((coal, weather), (production, [holidays, weekdays]))) = rayon::join(
            || rayon::join(|| self.price_frame(), || self.load_frame()),
            || {
                rayon::join(
                    || rayon::join(|| self.coal_frame(), || self.weather_frame()),
                    || rayon::join(|| self.production_frame(), || self.calendar_frames()),
                )
            },
        );
        Ok(vec![price?, load?, coal?, weather?, production?, holidays, weekdays])
    }

    fn market_frame(&self, name: &str, source: &MarketSourceConfig) -> Result<SourceFrame> {
        let series = MarketSeriesReader::new(name, &source.dir)
            .with_value_column(source.value_column)
            .with_missing_marker(source.missing_marker.as_str())
            .read()?;
        let realigned = realign(series, &self.dst_table);
        Ok(SourceFrame::hourly(name, Frame::from_series(realigned)))
    }

    fn price_frame(&self) -> Result<SourceFrame> {
        self.market_frame("price", &self.config.price)
    }

    fn load_frame(&self) -> Result<SourceFrame> {
        self.market_frame("load", &self.config.load)
    }

    fn coal_frame(&self) -> Result<SourceFrame> {
        let coal = &self.config.coal;
        let series = CoalPriceReader::new(&coal.file)
            .with_header_rows(coal.header_rows)
            .with_value_column(coal.value_column.as_str())
            .read()?;
        Ok(SourceFrame::daily("coal", Frame::from_optional_series(series)))
    }

    fn weather_frame(&self) -> Result<SourceFrame> {
        let weather = &self.config.weather;
        let observations = WeatherReader::new(&weather.file)
            .with_utc_offset_hours(weather.utc_offset_hours)
            .read()?;
        let span_start = self.config.pipeline.start.and_time(NaiveTime::MIN);
        let span_end = self
            .config
            .pipeline
            .end
            .and_hms_opt(23, 0, 0)
            .unwrap_or(span_start);
        let frame = WeatherAggregator::new(span_start, span_end)
            .with_gap_fill(weather.gap_fill)
            .aggregate(&observations);
        Ok(SourceFrame::hourly("weather", frame))
    }

    fn production_frame(&self) -> Result<SourceFrame> {
        let production = &self.config.production;
        let table = ProductionReader::new(&production.file)
            .with_timestamp_column(production.timestamp_column.as_str())
            .with_price_area(production.price_area())
            .with_start(self.config.pipeline.start.and_time(NaiveTime::MIN))
            .read()?;
        Ok(SourceFrame::hourly("production", derive_production_features(&table)?))
    }

    /// Holiday/weekend flags and weekday one-hot columns
    fn calendar_frames(&self) -> [SourceFrame; 2] {
        let pipeline = &self.config.pipeline;
        let records = generate_calendar(
            pipeline.start,
            pipeline.end,
            pipeline.frequency,
            self.calendar.as_ref(),
        );
        let cadence: Cadence = pipeline.frequency.cadence();
        [
            SourceFrame {
                name: "holidays".to_string(),
                cadence,
                frame: holiday_frame(&records),
            },
            SourceFrame {
                name: "weekdays".to_string(),
                cadence,
                frame: weekday_dummies(&records),
            },
        ]
    }
}
