use chrono::NaiveDateTime;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building the feature table.
///
/// Readers surface these immediately and the whole run fails; a source that
/// silently went missing would change the column set of the joined table.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{origin}:{line}: parse error: {message}")]
    Parse {
        origin: String,
        line: u64,
        message: String,
    },

    #[error("{origin}: required column '{column}' {}", describe_at(.at))]
    MissingColumn {
        origin: String,
        column: String,
        at: Option<NaiveDateTime>,
    },

    #[error("Unknown city '{city}' (not in the population table)")]
    UnknownCity { city: String },

    #[error("No holiday calendar for country '{country}'")]
    UnsupportedCountry { country: String },

    #[error("Column '{column}' is provided by more than one source")]
    DuplicateColumn { column: String },

    #[error("Invalid hour of day: {hour} (expected 0-23)")]
    InvalidHour { hour: u32 },

    #[error("No CSV files found in {}", .dir.display())]
    NoInputFiles { dir: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Workbook error on {}: {message}", .path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_at(at: &Option<NaiveDateTime>) -> String {
    match at {
        Some(ts) => format!("has no value at {ts}"),
        None => "is missing".to_string(),
    }
}

impl PipelineError {
    pub(crate) fn parse(origin: impl Into<String>, line: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            origin: origin.into(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn missing_column(origin: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            origin: origin.into(),
            column: column.into(),
            at: None,
        }
    }

    pub(crate) fn workbook(path: impl Into<PathBuf>, error: impl std::fmt::Display) -> Self {
        Self::Workbook {
            path: path.into(),
            message: error.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<validator::ValidationErrors> for PipelineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        PipelineError::InvalidConfig(errors.to_string())
    }
}

impl From<figment::Error> for PipelineError {
    fn from(error: figment::Error) -> Self {
        PipelineError::InvalidConfig(error.to_string())
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
