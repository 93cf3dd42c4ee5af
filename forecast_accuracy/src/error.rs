//! Error types for the forecast_accuracy crate

use thiserror::Error;

/// Custom error types for the forecast_accuracy crate
#[derive(Debug, Error)]
pub enum AccuracyError {
    /// A required column is absent from an input table
    #[error("Missing required column '{column}' in {table}")]
    MissingColumn {
        /// Logical table name (e.g. `future_forecast`)
        table: String,
        /// Standard column name that could not be found
        column: String,
    },

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    CsvError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, AccuracyError>;

impl From<csv::Error> for AccuracyError {
    fn from(err: csv::Error) -> Self {
        AccuracyError::CsvError(err.to_string())
    }
}
