//! Feature-table assembly for day-ahead electricity price forecasting.
//!
//! Raw market, weather, production and coal exports are read, realigned to a
//! single standard-time clock, turned into features and outer-joined into one
//! table with a row per day at a chosen hour.

pub mod assembly;
pub mod config;
pub mod domain;
pub mod dst;
pub mod error;
pub mod features;
pub mod output;
pub mod pipeline;
pub mod sources;
pub mod telemetry;

pub use assembly::{assemble, FeatureTable, SourceFrame};
pub use config::Config;
pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;
