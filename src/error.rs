use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a source file into a [`Table`](crate::data::model::Table).
///
/// Any of these aborts the load; no partially read table is kept.
#[derive(Error, Debug)]
pub enum DataFormatError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error("row {row}: '{value}' in column '{column}' is not a date")]
    InvalidDate {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: '{value}' in column '{column}' is not a number")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("column '{column}' has unsupported type {data_type}")]
    UnsupportedColumnType { column: String, data_type: String },

    #[error("{0}")]
    Malformed(String),
}

/// Failure to serialize a report. The filtered view is never touched.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown statistic '{0}' (expected one of count, mean, std, min, 25%, 50%, 75%, max)")]
pub struct ParseStatisticError(pub String);
