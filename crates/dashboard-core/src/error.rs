use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the payroll dashboard pipeline.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// A record file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Neither a collection file nor a collection directory exists.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// One of the source fetches failed; the whole load is abandoned.
    #[error("Failed to fetch collection {collection}: {reason}")]
    FetchFailed { collection: String, reason: String },

    /// Both fetches succeeded but neither returned any record.
    #[error("No expenditure or earnings records available")]
    NoData,

    /// A month-range selector was neither `all` nor a positive integer.
    #[error("Invalid month range: {0}")]
    InvalidRange(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashboardError>;
