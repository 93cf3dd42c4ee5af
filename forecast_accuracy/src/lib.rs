//! # Forecast Accuracy
//!
//! Forecast-accuracy measurement and method segmentation for demand series.
//!
//! ## Features
//!
//! - Demand records keyed by SKU, location and echelon
//! - Alignment of historical forecasts with actual sales
//! - CSV loading with column mapping and numeric coercion
//! - Per SKU x echelon accuracy metrics (RMSE, MAE, MAPE, Bias, WAPE)
//! - Accuracy tiers and a decision table choosing a safety-stock method
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use forecast_accuracy::{
//!     calculate_accuracy_metrics, segment, HistoryRecord, SelectedMethod, SeriesKey,
//!     TierThresholds,
//! };
//!
//! let key = SeriesKey::new("SKU-A", "LOC-1", "DC");
//! let history: Vec<HistoryRecord> = [(100.0, 90.0), (100.0, 110.0), (100.0, 100.0)]
//!     .iter()
//!     .enumerate()
//!     .map(|(day, &(forecast, actual))| HistoryRecord {
//!         key: key.clone(),
//!         date: NaiveDate::from_ymd_opt(2024, 1, 1 + day as u32).unwrap(),
//!         forecast: Some(forecast),
//!         actual: Some(actual),
//!         lead_time: Some(7.0),
//!         service_level: Some(0.95),
//!         attributes: Default::default(),
//!     })
//!     .collect();
//!
//! let metrics = calculate_accuracy_metrics(&history);
//! let outcome = segment(&metrics, true, true, &TierThresholds::default());
//!
//! let assignments = outcome.assignments().unwrap();
//! assert_eq!(assignments[0].selected_method, SelectedMethod::ForecastBased);
//! ```

pub mod alignment;
pub mod data;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod segmentation;

// Re-export commonly used types
pub use crate::alignment::align_history;
pub use crate::data::{
    Attributes, FeatureValue, FutureRecord, HistoryRecord, PastActual, PastForecast, SeriesKey,
};
pub use crate::error::{AccuracyError, Result};
pub use crate::loader::{ColumnMapping, CsvLoader};
pub use crate::metrics::{calculate_accuracy_metrics, AccuracyMetricRow};
pub use crate::segmentation::{
    classify_tiers, decide_method, segment, MethodAssignment, SegmentationOutcome,
    SelectedMethod, Tier, TierBasis, TierProfile, TierThresholds,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
