//! Rule-based safety stock: `z * sigma * sqrt(lead_time)`
//!
//! Two scale choices exist. With history, `sigma` is the standard deviation
//! of actual demand. Without history, `sqrt(forecast)` serves as a Poisson
//! variance proxy.

use super::{required_lead_time, required_service_level, HistoryIndex, KeyedEstimate, SeriesHistory};
use crate::{Result, SafetyStockError};
use forecast_accuracy::FutureRecord;
use stock_math::{round2, z_score, MathError};
use tracing::debug;

/// Fewest valid history points for the demand-deviation variant
pub const MIN_HISTORY_FOR_DEMAND_SIGMA: usize = 2;

/// Safety stock from the spread of historical actual demand
pub fn rule_ss_from_history(history: &SeriesHistory, lead_time: f64, service_level: f64) -> Result<f64> {
    if history.len() < MIN_HISTORY_FOR_DEMAND_SIGMA {
        return Err(MathError::InsufficientData(format!(
            "need {} history points for demand deviation, have {}",
            MIN_HISTORY_FOR_DEMAND_SIGMA,
            history.len()
        ))
        .into());
    }

    let z = z_score(service_level)?;
    Ok(round2(z * history.demand_std_dev() * lead_time.sqrt()))
}

/// Safety stock from a forecast alone, using `sqrt(forecast)` as the demand
/// deviation. Negative forecasts contribute no variability.
pub fn rule_ss_from_forecast(forecast: f64, lead_time: f64, service_level: f64) -> Result<f64> {
    let z = z_score(service_level)?;
    Ok(round2(z * forecast.max(0.0).sqrt() * lead_time.sqrt()))
}

/// Rule-based safety stock for every future row.
///
/// When `history` is given, series with enough history use the demand
/// deviation; all other rows use the forecast proxy. Rows missing a lead time
/// or service level fail the whole table.
pub fn rule_based_table(
    future: &[FutureRecord],
    history: Option<&HistoryIndex>,
) -> Result<Vec<KeyedEstimate>> {
    let mut from_history = 0usize;
    let estimates = future
        .iter()
        .map(|row| {
            let lead_time = required_lead_time(row)?;
            let service_level = required_service_level(row)?;
            if !row.forecast.is_finite() {
                return Err(SafetyStockError::MissingField {
                    key: row.key.clone(),
                    field: "forecast",
                });
            }

            let series = history.map(|index| index.series(&row.key)).unwrap_or_default();
            let value = if series.len() >= MIN_HISTORY_FOR_DEMAND_SIGMA {
                from_history += 1;
                rule_ss_from_history(&series, lead_time, service_level)?
            } else {
                rule_ss_from_forecast(row.forecast, lead_time, service_level)?
            };

            Ok(KeyedEstimate {
                key: row.key.clone(),
                date: row.date,
                value,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        rows = estimates.len(),
        from_history,
        "computed rule-based safety stock"
    );
    Ok(estimates)
}
