//! One-call pipeline: metrics, segmentation, estimation and merge

use crate::config::RunConfig;
use crate::selector::{run_safety_stock_selector, MergedTable};
use crate::Result;
use forecast_accuracy::{
    calculate_accuracy_metrics, segment, AccuracyMetricRow, FutureRecord, HistoryRecord,
    SegmentationOutcome,
};
use tracing::info;

/// Everything a run produces
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Accuracy metrics per SKU x echelon; empty without past data
    pub metrics: Vec<AccuracyMetricRow>,
    pub segmentation: SegmentationOutcome,
    /// One row per future forecast row
    pub results: MergedTable,
}

/// Run the whole pipeline against an immutable configuration.
///
/// The configuration is validated before any estimator runs, so flagging past
/// data as available without supplying history fails here.
pub fn run_pipeline(
    config: &RunConfig,
    history: Option<&[HistoryRecord]>,
    future: &[FutureRecord],
) -> Result<PipelineOutput> {
    config.validate(history)?;

    let metrics = match history {
        Some(history) if config.has_past_data() => calculate_accuracy_metrics(history),
        _ => Vec::new(),
    };
    let segmentation = segment(
        &metrics,
        config.past_sales_available,
        config.past_forecast_available,
        &config.tiers,
    );

    let results = run_safety_stock_selector(config, future, history, &segmentation)?;

    info!(
        future_rows = future.len(),
        metric_rows = metrics.len(),
        columns = results.columns().len(),
        "pipeline finished"
    );

    Ok(PipelineOutput {
        metrics,
        segmentation,
        results,
    })
}
