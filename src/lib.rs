//! # Safety Stock Workspace
//!
//! Facade over the workspace crates:
//!
//! - [`stock_math`]: statistics, z-scores, random forest and posterior sampling
//! - [`forecast_accuracy`]: demand records, accuracy metrics and segmentation
//! - [`safety_stock`]: estimators, result selection and the run pipeline
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use safety_stock_workspace::prelude::*;
//!
//! let key = SeriesKey::new("SKU-B", "LOC-1", "DC");
//! let history: Vec<HistoryRecord> = (1..=2)
//!     .map(|day| HistoryRecord {
//!         key: key.clone(),
//!         date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
//!         forecast: Some(50.0),
//!         actual: Some(10.0),
//!         lead_time: Some(7.0),
//!         service_level: Some(0.95),
//!         attributes: Default::default(),
//!     })
//!     .collect();
//!
//! // RMSE of 40 on a demand of 10 always falls back to the rule
//! let metrics = calculate_accuracy_metrics(&history);
//! let outcome = segment(&metrics, true, true, &TierThresholds::default());
//! assert_eq!(
//!     outcome.assignments().unwrap()[0].selected_method,
//!     SelectedMethod::RuleBased
//! );
//! ```

pub use forecast_accuracy;
pub use safety_stock;
pub use stock_math;

/// Commonly used items from every workspace crate
pub mod prelude {
    pub use forecast_accuracy::{
        align_history, calculate_accuracy_metrics, segment, AccuracyMetricRow, CsvLoader,
        FutureRecord, HistoryRecord, SegmentationOutcome, SelectedMethod, SeriesKey,
        TierThresholds,
    };
    pub use safety_stock::{
        run_pipeline, EstimateColumn, MergedTable, MethodChoice, RunConfig, SafetyStockError,
    };
    pub use stock_math::{round2, z_score};
}
