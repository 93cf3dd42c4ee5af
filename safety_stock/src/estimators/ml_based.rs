//! Machine-learned safety stock
//!
//! Per series, a random forest learns absolute forecast error from contextual
//! features; safety stock is `z * predicted_abs_error` for each future row.
//! Features come from a [`FeatureSchema`] declared once from the history and
//! future tables, so training and scoring always use the same columns.

use super::{
    for_each_series, group_future, required_service_level, HistoryIndex, KeyedEstimate,
    SeriesHistory,
};
use crate::config::MlConfig;
use crate::{Result, SafetyStockError};
use forecast_accuracy::alignment::{base_feature_name, ACTUAL_SUFFIX, FORECAST_SUFFIX};
use forecast_accuracy::{Attributes, FeatureValue, FutureRecord, HistoryRecord, SeriesKey};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};
use stock_math::{mean, population_std_dev, round2, z_score, RandomForestRegressor};
use tracing::{debug, info};

/// How a feature is encoded
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    Numeric,
    /// One-hot over `levels[1..]`; the first sorted level is the baseline
    Categorical { levels: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
}

impl FeatureSpec {
    fn width(&self) -> usize {
        match &self.kind {
            FeatureKind::Numeric => 1,
            FeatureKind::Categorical { levels } => levels.len().saturating_sub(1),
        }
    }
}

/// Feature columns shared by history and future rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureSchema {
    features: Vec<FeatureSpec>,
}

impl FeatureSchema {
    /// Declare the schema: `lead_time`, `service_level` and every attribute
    /// present in both tables once `_fcst`/`_act` suffixes are stripped.
    /// An attribute is numeric only if every observed value is numeric.
    pub fn declare(history: &[HistoryRecord], future: &[FutureRecord]) -> Self {
        let future_names: BTreeSet<&str> = future
            .iter()
            .flat_map(|row| row.attributes.keys().map(String::as_str))
            .collect();
        let shared: BTreeSet<&str> = history
            .iter()
            .flat_map(|r| r.attributes.keys().map(|name| base_feature_name(name)))
            .filter(|name| future_names.contains(name))
            .collect();

        let mut features = vec![
            FeatureSpec {
                name: "lead_time".to_string(),
                kind: FeatureKind::Numeric,
            },
            FeatureSpec {
                name: "service_level".to_string(),
                kind: FeatureKind::Numeric,
            },
        ];

        for name in shared {
            let observed = history
                .iter()
                .filter_map(|r| history_attribute(&r.attributes, name))
                .chain(future.iter().filter_map(|r| r.attributes.get(name)));

            let mut levels = BTreeSet::new();
            let mut all_numeric = true;
            for value in observed {
                match value {
                    FeatureValue::Numeric(v) => {
                        levels.insert(v.to_string());
                    }
                    FeatureValue::Category(c) => {
                        all_numeric = false;
                        levels.insert(c.clone());
                    }
                }
            }

            let kind = if all_numeric {
                FeatureKind::Numeric
            } else {
                FeatureKind::Categorical {
                    levels: levels.into_iter().collect(),
                }
            };
            features.push(FeatureSpec {
                name: name.to_string(),
                kind,
            });
        }

        Self { features }
    }

    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    /// Encoded row width
    pub fn width(&self) -> usize {
        self.features.iter().map(FeatureSpec::width).sum()
    }

    pub fn encode_history(&self, record: &HistoryRecord) -> Vec<f64> {
        self.encode(record.lead_time, record.service_level, |name| {
            history_attribute(&record.attributes, name)
        })
    }

    pub fn encode_future(&self, row: &FutureRecord) -> Vec<f64> {
        self.encode(row.lead_time, row.service_level, |name| row.attributes.get(name))
    }

    /// Missing numeric values encode as 0, unseen or missing levels as all zeros
    fn encode<'a, F>(&self, lead_time: Option<f64>, service_level: Option<f64>, lookup: F) -> Vec<f64>
    where
        F: Fn(&str) -> Option<&'a FeatureValue>,
    {
        let mut encoded = Vec::with_capacity(self.width());
        for spec in &self.features {
            let value = match spec.name.as_str() {
                "lead_time" => lead_time.map(FeatureValue::Numeric),
                "service_level" => service_level.map(FeatureValue::Numeric),
                name => lookup(name).cloned(),
            };

            match &spec.kind {
                FeatureKind::Numeric => {
                    let number = match value {
                        Some(FeatureValue::Numeric(v)) if v.is_finite() => v,
                        _ => 0.0,
                    };
                    encoded.push(number);
                }
                FeatureKind::Categorical { levels } => {
                    let level = match value {
                        Some(FeatureValue::Numeric(v)) => Some(v.to_string()),
                        Some(FeatureValue::Category(c)) => Some(c),
                        None => None,
                    };
                    encoded.extend(
                        levels
                            .iter()
                            .skip(1)
                            .map(|l| if level.as_deref() == Some(l.as_str()) { 1.0 } else { 0.0 }),
                    );
                }
            }
        }
        encoded
    }
}

/// Historical attribute by base name: exact name first, then the forecast
/// side, then the actual side
fn history_attribute<'a>(attributes: &'a Attributes, name: &str) -> Option<&'a FeatureValue> {
    attributes
        .get(name)
        .or_else(|| attributes.get(&format!("{}{}", name, FORECAST_SUFFIX)))
        .or_else(|| attributes.get(&format!("{}{}", name, ACTUAL_SUFFIX)))
}

fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    sorted.len()
}

/// ML-based safety stock for every future row whose series has history.
///
/// Series with fewer than `config.min_history` rows, or whose absolute error
/// never varies, use `z * std(|error|)` instead of a fitted forest. Future
/// rows without history get no estimate.
pub fn ml_based_table(
    history: &[HistoryRecord],
    future: &[FutureRecord],
    config: &MlConfig,
    parallel: bool,
) -> Result<Vec<KeyedEstimate>> {
    let schema = FeatureSchema::declare(history, future);
    let index = HistoryIndex::new(history);
    let groups = group_future(future);

    info!(
        series = groups.len(),
        features = schema.features().len(),
        encoded_width = schema.width(),
        "running ML-based estimator"
    );

    for_each_series(&groups, parallel, |key, rows| {
        let series = index.series(key);
        if series.is_empty() {
            debug!(series = %key, "no history, skipping ML estimate");
            return Ok(Vec::new());
        }
        estimate_series(key, &series, rows, &schema, config)
    })
}

fn estimate_series(
    key: &SeriesKey,
    series: &SeriesHistory,
    rows: &[&FutureRecord],
    schema: &FeatureSchema,
    config: &MlConfig,
) -> Result<Vec<KeyedEstimate>> {
    let targets: Vec<f64> = series.errors().iter().map(|e| e.abs()).collect();

    let predicted: Vec<f64> =
        if targets.len() < config.min_history || distinct_count(&targets) <= 1 {
            let fallback = population_std_dev(&targets).unwrap_or(0.0);
            debug!(series = %key, rows = targets.len(), "using std(|error|) fallback");
            vec![fallback; rows.len()]
        } else {
            let features: Vec<Vec<f64>> = series
                .records()
                .iter()
                .map(|r| schema.encode_history(r))
                .collect();
            let forest = fit_with_holdout(key, &features, &targets, config)?;
            let future_features: Vec<Vec<f64>> =
                rows.iter().map(|r| schema.encode_future(r)).collect();
            forest.predict(&future_features)?
        };

    rows.iter()
        .zip(predicted)
        .map(|(row, abs_error)| {
            let z = z_score(required_service_level(row)?)?;
            Ok(KeyedEstimate {
                key: row.key.clone(),
                date: row.date,
                value: round2(z * abs_error),
            })
        })
        .collect()
}

/// Train on a seeded shuffle of the rows, score the held-out share
fn fit_with_holdout(
    key: &SeriesKey,
    features: &[Vec<f64>],
    targets: &[f64],
    config: &MlConfig,
) -> Result<RandomForestRegressor> {
    let n = targets.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(config.forest.seed));

    let holdout = ((n as f64 * config.holdout_fraction).ceil() as usize).min(n - 1);
    let (test_idx, train_idx) = order.split_at(holdout);

    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
        idx.iter()
            .map(|&i| (features[i].clone(), targets[i]))
            .unzip()
    };
    let (train_x, train_y) = pick(train_idx);
    let (test_x, test_y) = pick(test_idx);

    let mut forest = RandomForestRegressor::new(config.forest.clone())?;
    forest
        .fit(&train_x, &train_y)
        .map_err(|e| SafetyStockError::Estimation {
            key: key.clone(),
            message: e.to_string(),
        })?;

    if !test_x.is_empty() {
        let predictions = forest.predict(&test_x)?;
        let abs_errors: Vec<f64> = predictions
            .iter()
            .zip(&test_y)
            .map(|(p, y)| (p - y).abs())
            .collect();
        debug!(
            series = %key,
            train = train_y.len(),
            holdout = test_y.len(),
            holdout_mae = mean(&abs_errors).unwrap_or(0.0),
            "fitted error forest"
        );
    }

    Ok(forest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn history_with(attributes: Attributes) -> HistoryRecord {
        HistoryRecord {
            key: SeriesKey::new("S", "L", "E"),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            forecast: Some(10.0),
            actual: Some(8.0),
            lead_time: Some(3.0),
            service_level: Some(0.9),
            attributes,
        }
    }

    fn future_with(attributes: Attributes) -> FutureRecord {
        FutureRecord {
            key: SeriesKey::new("S", "L", "E"),
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            forecast: 10.0,
            lead_time: Some(3.0),
            service_level: Some(0.9),
            attributes,
        }
    }

    #[test]
    fn test_schema_keeps_shared_attributes_only() {
        let mut hist_attrs = Attributes::new();
        hist_attrs.insert("promo_fcst".into(), FeatureValue::Numeric(1.0));
        hist_attrs.insert("promo_act".into(), FeatureValue::Numeric(0.0));
        hist_attrs.insert("weather".into(), FeatureValue::Category("rain".into()));
        let mut fut_attrs = Attributes::new();
        fut_attrs.insert("promo".into(), FeatureValue::Numeric(1.0));
        fut_attrs.insert("region".into(), FeatureValue::Category("north".into()));

        let schema = FeatureSchema::declare(&[history_with(hist_attrs)], &[future_with(fut_attrs)]);
        let names: Vec<&str> = schema.features().iter().map(|f| f.name.as_str()).collect();

        assert_eq!(names, vec!["lead_time", "service_level", "promo"]);
        assert_eq!(schema.width(), 3);
    }

    #[test]
    fn test_categorical_drops_first_level() {
        let mut a = Attributes::new();
        a.insert("region".into(), FeatureValue::Category("east".into()));
        let mut b = Attributes::new();
        b.insert("region".into(), FeatureValue::Category("west".into()));

        let schema = FeatureSchema::declare(&[history_with(a.clone())], &[future_with(b.clone())]);
        assert_eq!(schema.width(), 3);
        assert_eq!(schema.encode_history(&history_with(a)), vec![3.0, 0.9, 0.0]);
        assert_eq!(schema.encode_future(&future_with(b)), vec![3.0, 0.9, 1.0]);

        let mut unseen = Attributes::new();
        unseen.insert("region".into(), FeatureValue::Category("south".into()));
        assert_eq!(schema.encode_future(&future_with(unseen)), vec![3.0, 0.9, 0.0]);
    }

    #[test]
    fn test_distinct_count() {
        assert_eq!(distinct_count(&[2.0, 2.0, 2.0]), 1);
        assert_eq!(distinct_count(&[1.0, 2.0, 1.0]), 2);
    }
}
