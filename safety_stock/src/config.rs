//! Run configuration
//!
//! A [`RunConfig`] is built once before a run and passed by reference into the
//! pipeline; nothing reads process-wide state.

use crate::{Result, SafetyStockError};
use forecast_accuracy::{ColumnMapping, HistoryRecord, TierThresholds};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use stock_math::{ForestParams, SamplerParams};

/// Which estimators the selector runs when past data is available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodChoice {
    /// Rule-based estimator only
    #[default]
    RuleOnly,
    /// Machine-learned estimator only
    MlOnly,
    /// Machine-learned and rule-based side by side (plus Bayesian if enabled)
    Both,
    /// Error-based, hybrid and rule-based estimates, with the final value
    /// picked per series by accuracy segmentation
    Segmented,
}

impl FromStr for MethodChoice {
    type Err = SafetyStockError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rule-only" | "only rule-based" | "rule" => Ok(MethodChoice::RuleOnly),
            "ml-only" | "only ml" | "ml" => Ok(MethodChoice::MlOnly),
            "both" | "ml + rule-based" => Ok(MethodChoice::Both),
            "segmented" | "auto" => Ok(MethodChoice::Segmented),
            other => Err(SafetyStockError::Configuration(format!(
                "Unknown method choice: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for MethodChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodChoice::RuleOnly => write!(f, "rule-only"),
            MethodChoice::MlOnly => write!(f, "ml-only"),
            MethodChoice::Both => write!(f, "both"),
            MethodChoice::Segmented => write!(f, "segmented"),
        }
    }
}

/// Settings for the machine-learned estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlConfig {
    #[serde(flatten)]
    pub forest: ForestParams,
    /// Share of a series' history held out to score the fitted forest
    pub holdout_fraction: f64,
    /// Fewer historical rows than this use the z * std(|error|) fallback
    pub min_history: usize,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            holdout_fraction: 0.2,
            min_history: 5,
        }
    }
}

/// Settings for the Bayesian estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesianConfig {
    #[serde(flatten)]
    pub sampler: SamplerParams,
    /// Fewer error observations than this give a safety stock of 0
    pub min_history: usize,
}

impl Default for BayesianConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerParams::default(),
            min_history: 5,
        }
    }
}

/// Immutable configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub past_sales_available: bool,
    pub past_forecast_available: bool,
    pub method_choice: MethodChoice,
    /// Add the Bayesian estimator to `both` runs
    pub include_bayesian: bool,
    /// Run per-series training and sampling on the rayon pool
    pub parallel: bool,
    pub tiers: TierThresholds,
    pub ml: MlConfig,
    pub bayesian: BayesianConfig,
    /// Source headers for the CSV adapter
    pub columns: ColumnMapping,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            past_sales_available: false,
            past_forecast_available: false,
            method_choice: MethodChoice::default(),
            include_bayesian: false,
            parallel: true,
            tiers: TierThresholds::default(),
            ml: MlConfig::default(),
            bayesian: BayesianConfig::default(),
            columns: ColumnMapping::default(),
        }
    }
}

impl RunConfig {
    /// Configuration from a past-data answer and a method label such as
    /// `"Only Rule-based"`, `"Only ML"`, `"ML + Rule-based"` or `"segmented"`
    pub fn from_choice(has_past: bool, method_label: &str) -> Result<Self> {
        Ok(Self {
            past_sales_available: has_past,
            past_forecast_available: has_past,
            method_choice: method_label.parse()?,
            ..Self::default()
        })
    }

    /// Load a configuration from a JSON file; omitted fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Both past sales and past forecasts are available
    pub fn has_past_data(&self) -> bool {
        self.past_sales_available && self.past_forecast_available
    }

    /// Check the configuration against the supplied history before any
    /// estimator runs.
    pub fn validate(&self, history: Option<&[HistoryRecord]>) -> Result<()> {
        if self.has_past_data() && history.map_or(true, |h| h.is_empty()) {
            return Err(SafetyStockError::Configuration(
                "Past data flagged as available but no historical records were supplied"
                    .to_string(),
            ));
        }

        let t = &self.tiers;
        if t.rmse_low > t.rmse_medium || t.bias_low > t.bias_medium || t.mape_low > t.mape_medium {
            return Err(SafetyStockError::Configuration(
                "Tier thresholds must satisfy low <= medium".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.ml.holdout_fraction) {
            return Err(SafetyStockError::Configuration(format!(
                "ML holdout fraction must be in [0, 1), got {}",
                self.ml.holdout_fraction
            )));
        }
        if self.ml.min_history < 2 {
            return Err(SafetyStockError::Configuration(
                "ML minimum history must be at least 2".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_labels() {
        assert_eq!("Only Rule-based".parse::<MethodChoice>().unwrap(), MethodChoice::RuleOnly);
        assert_eq!("Only ML".parse::<MethodChoice>().unwrap(), MethodChoice::MlOnly);
        assert_eq!("ML + Rule-based".parse::<MethodChoice>().unwrap(), MethodChoice::Both);
        assert_eq!("segmented".parse::<MethodChoice>().unwrap(), MethodChoice::Segmented);
        assert!("everything".parse::<MethodChoice>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for choice in [
            MethodChoice::RuleOnly,
            MethodChoice::MlOnly,
            MethodChoice::Both,
            MethodChoice::Segmented,
        ] {
            assert_eq!(choice.to_string().parse::<MethodChoice>().unwrap(), choice);
        }
    }
}
