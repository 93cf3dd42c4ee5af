//! CSV export of merged results and accuracy metrics

use crate::selector::MergedTable;
use crate::Result;
use forecast_accuracy::{AccuracyMetricRow, FeatureValue, SegmentationOutcome};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;

const STANDARD_COLUMNS: [&str; 7] = [
    "sku_id",
    "location_id",
    "echelon_type",
    "date",
    "forecast",
    "lead_time",
    "service_level",
];

const SELECTED_METHOD_COLUMN: &str = "selected_method";

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write the merged table: key columns, forecast fields, attributes, every
/// estimate column and, for segmented runs, the selected method.
///
/// Attribute columns whose names repeat a standard or estimate column are
/// dropped, so every header name appears once.
pub fn write_merged_csv<W: Write>(table: &MergedTable, writer: W) -> Result<()> {
    let with_method = table.rows().iter().any(|r| r.selected_method.is_some());
    let reserved: BTreeSet<&str> = STANDARD_COLUMNS
        .iter()
        .copied()
        .chain(table.columns().iter().map(|c| c.name()))
        .chain(with_method.then_some(SELECTED_METHOD_COLUMN))
        .collect();
    let attribute_names: BTreeSet<&str> = table
        .rows()
        .iter()
        .flat_map(|r| r.future.attributes.keys().map(String::as_str))
        .filter(|name| !reserved.contains(name))
        .collect();

    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = STANDARD_COLUMNS.to_vec();
    header.extend(attribute_names.iter().copied());
    header.extend(table.columns().iter().map(|c| c.name()));
    if with_method {
        header.push(SELECTED_METHOD_COLUMN);
    }
    wtr.write_record(&header)?;

    for row in table.rows() {
        let future = &row.future;
        let mut record = vec![
            future.key.sku_id.clone(),
            future.key.location_id.clone().unwrap_or_default(),
            future.key.echelon_type.clone(),
            future.date.format("%Y-%m-%d").to_string(),
            future.forecast.to_string(),
            optional(future.lead_time),
            optional(future.service_level),
        ];
        record.extend(attribute_names.iter().map(|name| match future.attributes.get(*name) {
            Some(FeatureValue::Numeric(v)) => v.to_string(),
            Some(FeatureValue::Category(c)) => c.clone(),
            None => String::new(),
        }));
        record.extend(row.values.iter().map(|v| optional(*v)));
        if with_method {
            record.push(row.selected_method.map(|m| m.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct MetricsCsvRow<'a> {
    sku_id: &'a str,
    echelon_type: &'a str,
    lead_time: Option<f64>,
    service_level: Option<f64>,
    rmse: f64,
    mae: f64,
    mape: Option<f64>,
    bias: f64,
    wape: f64,
    rmse_pct: f64,
    bias_pct: f64,
    sample_count: usize,
    rmse_tier: Option<String>,
    bias_tier: Option<String>,
    mape_tier: Option<String>,
    selected_method: Option<String>,
}

/// Write accuracy metrics, with tiers and selected method when segmentation ran
pub fn write_metrics_csv<W: Write>(
    metrics: &[AccuracyMetricRow],
    segmentation: &SegmentationOutcome,
    writer: W,
) -> Result<()> {
    let assignments = segmentation.assignments().unwrap_or(&[]);
    let mut wtr = csv::Writer::from_writer(writer);

    for row in metrics {
        let assignment = assignments.iter().find(|a| a.metrics.key == row.key);
        wtr.serialize(MetricsCsvRow {
            sku_id: &row.key.sku_id,
            echelon_type: &row.key.echelon_type,
            lead_time: row.lead_time,
            service_level: row.service_level,
            rmse: row.rmse,
            mae: row.mae,
            mape: row.mape,
            bias: row.bias,
            wape: row.wape,
            rmse_pct: row.rmse_pct,
            bias_pct: row.bias_pct,
            sample_count: row.sample_count,
            rmse_tier: assignment.map(|a| a.tiers.rmse.to_string()),
            bias_tier: assignment.map(|a| a.tiers.bias.to_string()),
            mape_tier: assignment.map(|a| a.tiers.mape.to_string()),
            selected_method: assignment.map(|a| a.selected_method.to_string()),
        })?;
    }

    wtr.flush()?;
    Ok(())
}
