//! Forecast-accuracy metrics per SKU x echelon
//!
//! History is grouped by `(sku_id, echelon_type)`; location is deliberately
//! not a grouping key so accuracy is judged at the SKU-echelon level. Each
//! group yields one [`AccuracyMetricRow`] keyed by an echelon-level
//! [`SeriesKey`] (no location), which matches every located series of that
//! SKU and echelon.

use crate::data::{HistoryRecord, SeriesKey};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stock_math::round2;
use tracing::{debug, info};

/// Guard for divisions by a demand total or mean
pub const EPSILON: f64 = 1e-9;

/// Actuals below this magnitude are excluded from MAPE
pub const MAPE_MIN_ACTUAL: f64 = 10.0;

/// Accuracy statistics for one SKU x echelon group.
///
/// Errors are `forecast - actual`, so a positive bias means over-forecasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetricRow {
    /// Echelon-level key (location is `None`)
    pub key: SeriesKey,
    /// First non-null lead time observed in the group
    pub lead_time: Option<f64>,
    /// First non-null service level observed in the group
    pub service_level: Option<f64>,
    pub rmse: f64,
    pub mae: f64,
    /// Percent; `None` when no actual reaches [`MAPE_MIN_ACTUAL`]
    pub mape: Option<f64>,
    pub bias: f64,
    /// Percent
    pub wape: f64,
    /// Mean absolute actual demand
    pub mean_actual: f64,
    /// RMSE as a percentage of mean absolute actual demand
    pub rmse_pct: f64,
    /// Bias as a percentage of mean absolute actual demand
    pub bias_pct: f64,
    /// Number of valid (forecast, actual) pairs
    pub sample_count: usize,
}

/// Compute one metric row per SKU x echelon group with at least one valid pair.
///
/// Rows whose forecast or actual is not numeric are dropped before
/// aggregation. Output is ordered by `(sku_id, echelon_type)`.
pub fn calculate_accuracy_metrics(history: &[HistoryRecord]) -> Vec<AccuracyMetricRow> {
    let mut groups: BTreeMap<(&str, &str), Vec<&HistoryRecord>> = BTreeMap::new();
    for record in history {
        groups
            .entry((record.key.sku_id.as_str(), record.key.echelon_type.as_str()))
            .or_default()
            .push(record);
    }

    let rows: Vec<AccuracyMetricRow> = groups
        .into_par_iter()
        .filter_map(|((sku, echelon), records)| group_metrics(sku, echelon, &records))
        .collect();

    info!(
        records = history.len(),
        groups = rows.len(),
        "computed accuracy metrics"
    );
    rows
}

fn group_metrics(sku: &str, echelon: &str, records: &[&HistoryRecord]) -> Option<AccuracyMetricRow> {
    let pairs: Vec<(f64, f64)> = records.iter().filter_map(|r| r.valid_pair()).collect();
    if pairs.is_empty() {
        debug!(sku, echelon, "skipping group without valid forecast/actual pairs");
        return None;
    }

    let n = pairs.len() as f64;
    let errors: Vec<f64> = pairs.iter().map(|(f, a)| f - a).collect();

    let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let bias = errors.iter().sum::<f64>() / n;

    let abs_error_total: f64 = errors.iter().map(|e| e.abs()).sum();
    let abs_actual_total: f64 = pairs.iter().map(|(_, a)| a.abs()).sum();
    let wape = abs_error_total / abs_actual_total.max(EPSILON) * 100.0;

    let qualifying: Vec<f64> = pairs
        .iter()
        .zip(&errors)
        .filter(|((_, a), _)| a.abs() >= MAPE_MIN_ACTUAL)
        .map(|((_, a), e)| e.abs() / a.abs())
        .collect();
    let mape = if qualifying.is_empty() {
        None
    } else {
        Some(qualifying.iter().sum::<f64>() / qualifying.len() as f64 * 100.0)
    };

    let mean_actual = abs_actual_total / n;
    let scale = mean_actual.max(EPSILON);

    Some(AccuracyMetricRow {
        key: SeriesKey::echelon_level(sku, echelon),
        lead_time: records.iter().find_map(|r| r.lead_time),
        service_level: records.iter().find_map(|r| r.service_level),
        rmse: round2(rmse),
        mae: round2(mae),
        mape: mape.map(round2),
        bias: round2(bias),
        wape: round2(wape),
        mean_actual: round2(mean_actual),
        rmse_pct: round2(rmse / scale * 100.0),
        bias_pct: round2(bias / scale * 100.0),
        sample_count: pairs.len(),
    })
}
