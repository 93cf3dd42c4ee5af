//! Accuracy tiers and safety-stock method selection
//!
//! Each metric row is discretized into a (RMSE, Bias, MAPE) tier profile, and
//! the profile is mapped to a method by a fixed decision table. The mapping is
//! total: any profile the table does not name falls back to rule-based.

use crate::metrics::AccuracyMetricRow;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Discrete accuracy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    /// All tiers, low to high
    pub const ALL: [Tier; 3] = [Tier::Low, Tier::Medium, Tier::High];

    /// `Low` up to `low`, `Medium` up to `medium`, otherwise `High`.
    /// A missing or NaN value is `High`.
    pub fn classify(value: Option<f64>, low: f64, medium: f64) -> Tier {
        match value {
            Some(v) if v <= low => Tier::Low,
            Some(v) if v <= medium => Tier::Medium,
            _ => Tier::High,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Low => write!(f, "low"),
            Tier::Medium => write!(f, "medium"),
            Tier::High => write!(f, "high"),
        }
    }
}

/// Safety-stock method chosen for a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectedMethod {
    #[serde(rename = "Rule-based")]
    RuleBased,
    #[serde(rename = "Forecast-based")]
    ForecastBased,
    #[serde(rename = "Hybrid")]
    Hybrid,
}

impl fmt::Display for SelectedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectedMethod::RuleBased => write!(f, "Rule-based"),
            SelectedMethod::ForecastBased => write!(f, "Forecast-based"),
            SelectedMethod::Hybrid => write!(f, "Hybrid"),
        }
    }
}

/// Scale on which RMSE and Bias are compared against their thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierBasis {
    /// Percent of the group's mean absolute actual demand
    RelativeToMeanDemand,
    /// Raw demand units
    Absolute,
}

/// Tier boundaries (inclusive upper bounds of `Low` and `Medium`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub rmse_low: f64,
    pub rmse_medium: f64,
    pub bias_low: f64,
    pub bias_medium: f64,
    pub mape_low: f64,
    pub mape_medium: f64,
    pub basis: TierBasis,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            rmse_low: 10.0,
            rmse_medium: 20.0,
            bias_low: 5.0,
            bias_medium: 10.0,
            mape_low: 10.0,
            mape_medium: 20.0,
            basis: TierBasis::RelativeToMeanDemand,
        }
    }
}

/// Tier of each accuracy metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TierProfile {
    pub rmse: Tier,
    pub bias: Tier,
    pub mape: Tier,
}

/// Metric row with its tier profile and selected method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodAssignment {
    pub metrics: AccuracyMetricRow,
    pub tiers: TierProfile,
    pub selected_method: SelectedMethod,
}

/// Result of segmentation; callers must handle the no-past-data case
/// before treating the result as a table.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationOutcome {
    Assigned(Vec<MethodAssignment>),
    /// Past sales or past forecasts are unavailable; fall back to
    /// rule-based scoring of the future forecasts only.
    NoPastData,
}

impl SegmentationOutcome {
    /// The assignments, or `None` when there was no past data
    pub fn assignments(&self) -> Option<&[MethodAssignment]> {
        match self {
            SegmentationOutcome::Assigned(rows) => Some(rows),
            SegmentationOutcome::NoPastData => None,
        }
    }
}

/// Discretize a metric row
pub fn classify_tiers(row: &AccuracyMetricRow, thresholds: &TierThresholds) -> TierProfile {
    let (rmse, bias) = match thresholds.basis {
        TierBasis::RelativeToMeanDemand => (row.rmse_pct, row.bias_pct),
        TierBasis::Absolute => (row.rmse, row.bias),
    };

    TierProfile {
        rmse: Tier::classify(Some(rmse), thresholds.rmse_low, thresholds.rmse_medium),
        bias: Tier::classify(Some(bias.abs()), thresholds.bias_low, thresholds.bias_medium),
        mape: Tier::classify(row.mape, thresholds.mape_low, thresholds.mape_medium),
    }
}

/// Map a tier profile to a method; first matching rule wins
pub fn decide_method(profile: TierProfile) -> SelectedMethod {
    use SelectedMethod::*;
    use Tier::*;

    match (profile.rmse, profile.bias, profile.mape) {
        (High, _, _) | (_, High, _) => RuleBased,
        (Low, Low, Low | Medium) => ForecastBased,
        (Low, Low, High) => Hybrid,
        (Low, Medium, Low) => Hybrid,
        (Medium, Low, Low | Medium) => Hybrid,
        (Medium, Medium, Low) => Hybrid,
        _ => RuleBased,
    }
}

/// Assign a method to every metric row.
///
/// Returns [`SegmentationOutcome::NoPastData`] unless both past sales and past
/// forecasts are available.
pub fn segment(
    metrics: &[AccuracyMetricRow],
    past_sales_available: bool,
    past_forecast_available: bool,
    thresholds: &TierThresholds,
) -> SegmentationOutcome {
    if !(past_sales_available && past_forecast_available) {
        info!("no past data available, skipping segmentation");
        return SegmentationOutcome::NoPastData;
    }

    let assignments: Vec<MethodAssignment> = metrics
        .iter()
        .map(|row| {
            let tiers = classify_tiers(row, thresholds);
            MethodAssignment {
                metrics: row.clone(),
                tiers,
                selected_method: decide_method(tiers),
            }
        })
        .collect();

    let forecast_based = assignments
        .iter()
        .filter(|a| a.selected_method == SelectedMethod::ForecastBased)
        .count();
    let hybrid = assignments
        .iter()
        .filter(|a| a.selected_method == SelectedMethod::Hybrid)
        .count();
    info!(
        series = assignments.len(),
        forecast_based,
        hybrid,
        rule_based = assignments.len() - forecast_based - hybrid,
        "segmented series by forecast accuracy"
    );

    SegmentationOutcome::Assigned(assignments)
}
