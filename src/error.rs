use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by ingestion, loading and rendering.
#[derive(Debug, Error)]
pub enum Error {
    #[error("source table '{table}' has no column '{column}'")]
    MissingColumn { column: String, table: String },

    #[error("invalid value '{value}' in column '{column}', data row {row}")]
    InvalidCell {
        column: String,
        row: usize,
        value: String,
    },

    #[error("cannot parse record {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("record '{record}' has no samples")]
    EmptyRecord { record: String },

    #[error("nothing to render: the record collection is empty")]
    EmptyCollection,

    #[error("unsupported yield type '{0}' (expected 'charge' or 'light')")]
    UnsupportedYieldType(String),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("invalid path pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("drawing failed: {0}")]
    Render(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
