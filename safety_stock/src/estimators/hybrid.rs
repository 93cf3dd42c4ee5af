//! Hybrid safety stock
//!
//! Blends the RMSE estimate with the demand-spread estimate. The RMSE weight is
//! `1 - rmse / (rmse + sigma_demand)`: the more the forecast error dominates
//! demand spread, the less the RMSE estimate is trusted.

use super::SeriesHistory;
use crate::Result;
use stock_math::{mean, round2, z_score};

/// Weight used when both RMSE and demand spread are zero
pub const FALLBACK_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridEstimate {
    pub no_var: f64,
    /// `None` when the history has no lead times
    pub with_var: Option<f64>,
    /// Weight of the RMSE component, in `[0, 1]`
    pub weight_rmse: f64,
}

/// RMSE weight for the blend, clamped to `[0, 1]`
pub fn rmse_weight(rmse: f64, sigma_demand: f64) -> f64 {
    let total = rmse + sigma_demand;
    if total == 0.0 {
        FALLBACK_WEIGHT
    } else {
        (1.0 - rmse / total).clamp(0.0, 1.0)
    }
}

pub fn hybrid_safety_stock(
    history: &SeriesHistory,
    lead_time: f64,
    service_level: f64,
) -> Result<HybridEstimate> {
    let z = z_score(service_level)?;
    let rmse = history.rmse();
    let sigma_demand = history.demand_std_dev();
    let weight = rmse_weight(rmse, sigma_demand);
    let blend = |rmse_part: f64, rule_part: f64| weight * rmse_part + (1.0 - weight) * rule_part;

    let sqrt_lt = lead_time.sqrt();
    let no_var = blend(z * rmse * sqrt_lt, z * sigma_demand * sqrt_lt);

    // variability term uses mean actual demand
    let with_var = history.lead_time_std_dev().map(|sigma_lt| {
        let avg_demand = mean(&history.actuals()).unwrap_or(0.0);
        let lt_term = sigma_lt.powi(2) * avg_demand.powi(2);
        blend(
            z * (rmse.powi(2) * lead_time + lt_term).sqrt(),
            z * (sigma_demand.powi(2) * lead_time + lt_term).sqrt(),
        )
    });

    Ok(HybridEstimate {
        no_var: round2(no_var),
        with_var: with_var.map(round2),
        weight_rmse: round2(weight),
    })
}
