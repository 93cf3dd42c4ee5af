//! Safety-stock estimator bank
//!
//! Every estimator reads one series' history (and/or its future rows) and a
//! per-row lead time and service level, and returns a non-negative quantity
//! rounded to two decimals. Table-level entry points return
//! [`KeyedEstimate`] rows keyed by series and date for the selector to join.

pub mod bayesian;
pub mod error_based;
pub mod hybrid;
pub mod ml_based;
pub mod rule_based;

use crate::{Result, SafetyStockError};
use chrono::NaiveDate;
use forecast_accuracy::{FutureRecord, HistoryRecord, SeriesKey};
use rayon::prelude::*;
use std::collections::BTreeMap;
use stock_math::{mean, population_std_dev};

/// One estimated value for a future row
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedEstimate {
    pub key: SeriesKey,
    pub date: NaiveDate,
    pub value: f64,
}

/// Valid `(forecast, actual)` history of one series
#[derive(Debug, Clone, Default)]
pub struct SeriesHistory<'a> {
    records: Vec<&'a HistoryRecord>,
}

impl<'a> SeriesHistory<'a> {
    /// Keep only records whose forecast and actual are both numeric
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a HistoryRecord>,
    {
        Self {
            records: records
                .into_iter()
                .filter(|r| r.valid_pair().is_some())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[&'a HistoryRecord] {
        &self.records
    }

    fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.records.iter().filter_map(|r| r.valid_pair())
    }

    pub fn actuals(&self) -> Vec<f64> {
        self.pairs().map(|(_, a)| a).collect()
    }

    /// Forecast errors as `forecast - actual`
    pub fn errors(&self) -> Vec<f64> {
        self.pairs().map(|(f, a)| f - a).collect()
    }

    /// Finite lead times observed in the history
    pub fn lead_times(&self) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.lead_time)
            .filter(|lt| lt.is_finite())
            .collect()
    }

    /// Root mean squared error, 0 for an empty history
    pub fn rmse(&self) -> f64 {
        let squared: Vec<f64> = self.errors().iter().map(|e| e * e).collect();
        mean(&squared).unwrap_or(0.0).sqrt()
    }

    /// Mean absolute error, 0 for an empty history
    pub fn mae(&self) -> f64 {
        let absolute: Vec<f64> = self.errors().iter().map(|e| e.abs()).collect();
        mean(&absolute).unwrap_or(0.0)
    }

    /// Population standard deviation of actual demand
    pub fn demand_std_dev(&self) -> f64 {
        population_std_dev(&self.actuals()).unwrap_or(0.0)
    }

    /// Population standard deviation of lead time, `None` without lead times
    pub fn lead_time_std_dev(&self) -> Option<f64> {
        population_std_dev(&self.lead_times())
    }
}

/// History grouped by series key
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex<'a> {
    groups: BTreeMap<&'a SeriesKey, Vec<&'a HistoryRecord>>,
}

impl<'a> HistoryIndex<'a> {
    pub fn new(history: &'a [HistoryRecord]) -> Self {
        let mut groups: BTreeMap<&SeriesKey, Vec<&HistoryRecord>> = BTreeMap::new();
        for record in history {
            groups.entry(&record.key).or_default().push(record);
        }
        Self { groups }
    }

    /// History for `key`: the exact series when present, otherwise every
    /// series the key matches with location treated as a wildcard.
    pub fn series(&self, key: &SeriesKey) -> SeriesHistory<'a> {
        if let Some(records) = self.groups.get(key) {
            return SeriesHistory::from_records(records.iter().copied());
        }

        SeriesHistory::from_records(
            self.groups
                .iter()
                .filter(|(k, _)| k.matches(key))
                .flat_map(|(_, records)| records.iter().copied()),
        )
    }

    pub fn series_count(&self) -> usize {
        self.groups.len()
    }
}

/// Future rows grouped by series key, in key order
pub(crate) fn group_future(future: &[FutureRecord]) -> Vec<(&SeriesKey, Vec<&FutureRecord>)> {
    let mut groups: BTreeMap<&SeriesKey, Vec<&FutureRecord>> = BTreeMap::new();
    for row in future {
        groups.entry(&row.key).or_default().push(row);
    }
    groups.into_iter().collect()
}

/// Apply `estimate` to every series group, on the rayon pool when `parallel`.
/// Output keeps group order either way.
pub(crate) fn for_each_series<'f, F>(
    groups: &[(&'f SeriesKey, Vec<&'f FutureRecord>)],
    parallel: bool,
    estimate: F,
) -> Result<Vec<KeyedEstimate>>
where
    F: Fn(&SeriesKey, &[&FutureRecord]) -> Result<Vec<KeyedEstimate>> + Sync + Send,
{
    let per_series: Vec<Vec<KeyedEstimate>> = if parallel {
        groups
            .par_iter()
            .map(|(key, rows)| estimate(key, rows))
            .collect::<Result<_>>()?
    } else {
        groups
            .iter()
            .map(|(key, rows)| estimate(key, rows))
            .collect::<Result<_>>()?
    };
    Ok(per_series.into_iter().flatten().collect())
}

/// Lead time of a future row; must be present, finite and non-negative
pub(crate) fn required_lead_time(row: &FutureRecord) -> Result<f64> {
    match row.lead_time {
        Some(lt) if lt.is_finite() && lt >= 0.0 => Ok(lt),
        _ => Err(SafetyStockError::MissingField {
            key: row.key.clone(),
            field: "lead_time",
        }),
    }
}

/// Service level of a future row; must be present and finite
pub(crate) fn required_service_level(row: &FutureRecord) -> Result<f64> {
    match row.service_level {
        Some(sl) if sl.is_finite() => Ok(sl),
        _ => Err(SafetyStockError::MissingField {
            key: row.key.clone(),
            field: "service_level",
        }),
    }
}
