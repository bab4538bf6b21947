use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Required columns are absent from the input schema.
///
/// Unrecoverable for that input: the caller has to re-acquire a conforming
/// source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Missing required columns: {}", missing.join(", "))]
pub struct SchemaError {
    /// Names of the missing columns, in mapping order (start, end, site).
    pub missing: Vec<String>,
}

/// A malformed date-range selection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The range did not consist of exactly a start and an end date.
    #[error("Date range needs exactly two endpoints, got {0}")]
    EndpointCount(usize),

    /// The start date lies after the end date.
    #[error("Date range start {start} is after end {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

/// All errors produced by the dwell-time report.
#[derive(Error, Debug)]
pub enum DwellError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The document parsed as JSON but does not have a tabular layout.
    #[error("Invalid table layout: {0}")]
    InvalidTable(String),

    /// The file extension does not name a supported tabular format.
    #[error("Unsupported table format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A remote source could not be downloaded.
    #[error("Failed to fetch source: {0}")]
    Fetch(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the dwell crates.
pub type Result<T> = std::result::Result<T, DwellError>;
