use chrono::Duration;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

// ============================================================================
// Calendar Types
// ============================================================================

/// Sampling frequency of a generated calendar range
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Frequency {
    Hourly,
    #[default]
    Daily,
    /// Every 7 days counted from the range start
    Weekly,
}

impl Frequency {
    /// Step between two consecutive points
    pub fn step(&self) -> Duration {
        match self {
            Self::Hourly => Duration::hours(1),
            Self::Daily => Duration::days(1),
            Self::Weekly => Duration::weeks(1),
        }
    }

    /// How series sampled at this frequency line up with an hour-of-day
    pub fn cadence(&self) -> Cadence {
        match self {
            Self::Hourly => Cadence::Hourly,
            Self::Daily | Self::Weekly => Cadence::Daily,
        }
    }
}

/// Native resolution of a source, which decides how it is aligned to the
/// target hour during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Cadence {
    /// Keyed by clock hour; aligned by keeping rows at the target hour
    Hourly,
    /// Keyed by date at midnight; aligned by moving each key to the target hour
    Daily,
}

// ============================================================================
// Weather Types
// ============================================================================

/// Numeric weather metrics carried into the feature table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum WeatherMetric {
    Temp,
    FeelsLike,
    Humidity,
    CloudsAll,
    WindSpeed,
}

impl WeatherMetric {
    pub const COUNT: usize = 5;

    /// Column name, identical in the raw weather file and the feature table
    pub fn column(&self) -> &'static str {
        self.into()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// How a missing hour is reconstructed from its neighbours
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GapFill {
    /// `prev + next / 2`, the formula the historical feature tables were built with
    #[default]
    PrevPlusHalfNext,
    /// `(prev + next) / 2`
    Midpoint,
}

impl GapFill {
    pub fn apply(&self, prev: f64, next: f64) -> f64 {
        match self {
            Self::PrevPlusHalfNext => prev + next / 2.0,
            Self::Midpoint => (prev + next) / 2.0,
        }
    }
}

// ============================================================================
// Output Types
// ============================================================================

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

// ============================================================================
// Unit Tests
// ============================================================================
