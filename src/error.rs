use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required column, property or setting is missing or invalid
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An optional output backend is not compiled into this build
    #[error("environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to serialize map data: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Non-fatal data problem. The affected record carries an absent value.
#[derive(Debug, Clone, PartialEq)]
pub enum DataQualityWarning {
    UnparseableValue { row: usize, region: String, raw: String },
    NoMatchingValue { region: String },
    SkippedFeature { index: usize, region: String, reason: &'static str },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnparseableValue { row, region, raw } if raw.trim().is_empty() => {
                write!(f, "row {row} ({region}): empty value")
            }
            Self::UnparseableValue { row, region, raw } => {
                write!(f, "row {row} ({region}): '{raw}' is not a number")
            }
            Self::NoMatchingValue { region } => write!(f, "{region}: no matching value row"),
            Self::SkippedFeature { index, region, reason } if region.is_empty() => {
                write!(f, "feature {index}: skipped ({reason})")
            }
            Self::SkippedFeature { index, region, reason } => {
                write!(f, "feature {index} ({region}): skipped ({reason})")
            }
        }
    }
}
