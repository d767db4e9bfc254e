use chrono::NaiveDate;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

use crate::domain::{Frequency, GapFill, OutputFormat};
use crate::dst::STANDARD_TIME_UTC_OFFSET_HOURS;
use crate::error::{PipelineError, Result};

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "ELPRICE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "ELPRICE__";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub pipeline: PipelineConfig,
    #[validate(nested)]
    pub price: MarketSourceConfig,
    #[validate(nested)]
    pub load: MarketSourceConfig,
    #[validate(nested)]
    pub weather: WeatherConfig,
    #[validate(nested)]
    pub production: ProductionConfig,
    #[validate(nested)]
    pub coal: CoalConfig,
    #[validate(nested)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            price: MarketSourceConfig::price(),
            load: MarketSourceConfig::load(),
            weather: WeatherConfig::default(),
            production: ProductionConfig::default(),
            coal: CoalConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    /// Hour of day every output row is taken at
    #[validate(range(max = 23))]
    pub hour: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Holiday calendar country (ISO 3166 alpha-2)
    #[validate(length(equal = 2))]
    pub country: String,
    pub frequency: Frequency,
    /// Load the sources on the rayon pool instead of one after another
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hour: 11,
            start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2020, 11, 23).unwrap_or_default(),
            country: "DK".to_string(),
            frequency: Frequency::Daily,
            parallel: true,
        }
    }
}

/// A directory of market CSV exports (price or load)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MarketSourceConfig {
    #[validate(custom(function = "non_empty_path"))]
    pub dir: PathBuf,
    #[validate(range(min = 1))]
    pub value_column: usize,
    pub missing_marker: String,
}

impl MarketSourceConfig {
    pub fn price() -> Self {
        Self {
            dir: PathBuf::from("raw_data/price"),
            value_column: 1,
            missing_marker: "-".to_string(),
        }
    }

    /// Column 1 of the load export is the forecast; actual load is column 2
    pub fn load() -> Self {
        Self {
            dir: PathBuf::from("raw_data/load"),
            value_column: 2,
            missing_marker: "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WeatherConfig {
    #[validate(custom(function = "non_empty_path"))]
    pub file: PathBuf,
    /// Hours added to the UTC `dt` column; +1 puts weather on the same
    /// standard-time clock as the realigned price and load
    #[validate(range(min = -14, max = 14))]
    pub utc_offset_hours: i64,
    pub gap_fill: GapFill,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("raw_data/weather/weather.csv"),
            utc_offset_hours: STANDARD_TIME_UTC_OFFSET_HOURS,
            gap_fill: GapFill::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductionConfig {
    #[validate(custom(function = "non_empty_path"))]
    pub file: PathBuf,
    #[validate(length(min = 1))]
    pub timestamp_column: String,
    /// Bidding zone filter; empty string disables it
    pub price_area: Option<String>,
}

impl ProductionConfig {
    pub fn price_area(&self) -> Option<String> {
        self.price_area.clone().filter(|area| !area.trim().is_empty())
    }
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("raw_data/production/production.csv"),
            timestamp_column: "HourDK".to_string(),
            price_area: Some("DK1".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CoalConfig {
    #[validate(custom(function = "non_empty_path"))]
    pub file: PathBuf,
    pub header_rows: usize,
    #[validate(length(min = 1))]
    pub value_column: String,
}

impl Default for CoalConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("raw_data/coal/coal_price.xls"),
            header_rows: 2,
            value_column: "ROTTERDAM COAL".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutputConfig {
    #[validate(custom(function = "non_empty_path"))]
    pub path: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("features.csv"),
            format: OutputFormat::Csv,
        }
    }
}

fn non_empty_path(path: &PathBuf) -> std::result::Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        return Err(ValidationError::new("empty_path"));
    }
    Ok(())
}

impl Config {
    /// Defaults, then the TOML file from `ELPRICE_CONFIG` (or
    /// `config/default.toml`), then `ELPRICE__*` environment variables.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Like [`Config::load`] with an explicit file. A missing file is not an
    /// error; the defaults apply.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.check()?;
        Ok(config)
    }

    /// Field rules plus the cross-field ones the derive cannot express
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        if self.pipeline.start > self.pipeline.end {
            return Err(PipelineError::InvalidConfig(format!(
                "pipeline.start ({}) is after pipeline.end ({})",
                self.pipeline.start, self.pipeline.end
            )));
        }
        Ok(())
    }
}
