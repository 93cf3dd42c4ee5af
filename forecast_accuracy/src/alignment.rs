//! Alignment of historical forecasts with actual sales

use crate::data::{Attributes, HistoryRecord, PastActual, PastForecast, SeriesKey};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

/// Suffix for forecast-side attributes that collide with actual-side ones
pub const FORECAST_SUFFIX: &str = "_fcst";
/// Suffix for actual-side attributes that collide with forecast-side ones
pub const ACTUAL_SUFFIX: &str = "_act";

/// Inner-join forecast rows with actual rows on (sku, location, echelon, date).
///
/// Output follows forecast order; a forecast row matching several actual rows
/// produces one record per match. Attributes present on both sides are kept
/// twice with `_fcst` / `_act` suffixes.
pub fn align_history(forecasts: &[PastForecast], actuals: &[PastActual]) -> Vec<HistoryRecord> {
    let mut by_key: HashMap<(&SeriesKey, NaiveDate), Vec<&PastActual>> = HashMap::new();
    for actual in actuals {
        by_key
            .entry((&actual.key, actual.date))
            .or_default()
            .push(actual);
    }

    let mut aligned = Vec::with_capacity(forecasts.len());
    for forecast in forecasts {
        let Some(matches) = by_key.get(&(&forecast.key, forecast.date)) else {
            continue;
        };
        for actual in matches {
            aligned.push(HistoryRecord {
                key: forecast.key.clone(),
                date: forecast.date,
                forecast: forecast.forecast,
                actual: actual.actual,
                lead_time: forecast.lead_time,
                service_level: forecast.service_level,
                attributes: merge_attributes(&forecast.attributes, &actual.attributes),
            });
        }
    }

    debug!(
        forecasts = forecasts.len(),
        actuals = actuals.len(),
        aligned = aligned.len(),
        "aligned historical forecasts with actuals"
    );
    aligned
}

fn merge_attributes(forecast: &Attributes, actual: &Attributes) -> Attributes {
    let mut merged = Attributes::new();
    for (name, value) in forecast {
        if actual.contains_key(name) {
            merged.insert(format!("{}{}", name, FORECAST_SUFFIX), value.clone());
        } else {
            merged.insert(name.clone(), value.clone());
        }
    }
    for (name, value) in actual {
        if forecast.contains_key(name) {
            merged.insert(format!("{}{}", name, ACTUAL_SUFFIX), value.clone());
        } else {
            merged.insert(name.clone(), value.clone());
        }
    }
    merged
}

/// Strip an alignment suffix from a historical attribute name
pub fn base_feature_name(name: &str) -> &str {
    name.strip_suffix(FORECAST_SUFFIX)
        .or_else(|| name.strip_suffix(ACTUAL_SUFFIX))
        .unwrap_or(name)
}
