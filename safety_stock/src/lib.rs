//! # Safety Stock
//!
//! Safety-stock estimation for demand series keyed by SKU, location and
//! echelon.
//!
//! ## Estimators
//!
//! - **Rule-based**: `z * sigma * sqrt(lead_time)` from demand spread or a
//!   `sqrt(forecast)` proxy
//! - **Error-based**: RMSE and MAE driven, with an optional lead-time
//!   variability term
//! - **Hybrid**: RMSE and demand-spread estimates blended by a data-driven weight
//! - **ML-based**: a seeded random forest predicting absolute forecast error
//! - **Bayesian**: posterior mean of the error deviation under a Normal model
//!
//! The [`selector`] joins estimator columns onto the future forecast table and
//! [`pipeline::run_pipeline`] runs metrics, segmentation and selection in one
//! call.
//!
//! ## Usage Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use forecast_accuracy::{FutureRecord, SeriesKey};
//! use safety_stock::{run_pipeline, EstimateColumn, RunConfig};
//!
//! let future = vec![FutureRecord {
//!     key: SeriesKey::new("SKU-1", "LOC-1", "DC"),
//!     date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
//!     forecast: 36.0,
//!     lead_time: Some(9.0),
//!     service_level: Some(0.95),
//!     attributes: Default::default(),
//! }];
//!
//! // No past data: rule-based scoring of the future forecasts only
//! let output = run_pipeline(&RunConfig::default(), None, &future).unwrap();
//! let rule_ss = output.results.value(0, EstimateColumn::RuleSs).unwrap();
//! assert!((rule_ss - 29.61).abs() < 0.01);
//! ```

use forecast_accuracy::{AccuracyError, SeriesKey};
use stock_math::MathError;
use thiserror::Error;

pub mod config;
pub mod estimators;
pub mod pipeline;
pub mod report;
pub mod selector;

pub use config::{BayesianConfig, MethodChoice, MlConfig, RunConfig};
pub use estimators::{HistoryIndex, KeyedEstimate, SeriesHistory};
pub use pipeline::{run_pipeline, PipelineOutput};
pub use report::{write_merged_csv, write_metrics_csv};
pub use selector::{run_safety_stock_selector, EstimateColumn, MergedRow, MergedTable};

/// Errors that can occur while estimating safety stock
#[derive(Error, Debug)]
pub enum SafetyStockError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing required field '{field}' for series {key}")]
    MissingField { key: SeriesKey, field: &'static str },

    #[error("Estimation failed for series {key}: {message}")]
    Estimation { key: SeriesKey, message: String },

    #[error(transparent)]
    Accuracy(#[from] AccuracyError),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(String),

    #[error("JSON error: {0}")]
    JsonError(String),
}

impl From<csv::Error> for SafetyStockError {
    fn from(err: csv::Error) -> Self {
        SafetyStockError::CsvError(err.to_string())
    }
}

impl From<serde_json::Error> for SafetyStockError {
    fn from(err: serde_json::Error) -> Self {
        SafetyStockError::JsonError(err.to_string())
    }
}

/// Result type for safety-stock operations
pub type Result<T> = std::result::Result<T, SafetyStockError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
