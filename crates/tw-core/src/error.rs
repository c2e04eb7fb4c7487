use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the pipeline stages.
#[derive(Error, Debug)]
pub enum Error {
    /// A required input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `Date:` value attributed to a record did not match `%Y-%m-%d %H:%M:%S`.
    #[error("Invalid timestamp on line {line}: {value}")]
    TimestampParse { line: usize, value: String },

    /// A CSV table could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A table is missing a column the stage depends on.
    #[error("Missing column '{column}' in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// A stage found nothing to work with and cannot produce output.
    #[error("No data: {0}")]
    NoData(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the pipeline crates.
pub type Result<T> = std::result::Result<T, Error>;
