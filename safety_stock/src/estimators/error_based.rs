//! Error-based safety stock from RMSE and MAE
//!
//! Both estimators return a value without lead-time variability and, when the
//! history carries lead times, a value with the variability term
//! `sqrt(sigma^2 * lead_time + sigma_lt^2 * mean_abs_error^2)`.

use super::SeriesHistory;
use crate::Result;
use stock_math::{round2, z_score};

/// Ratio of MAE to standard deviation for normally distributed errors
pub const MAE_TO_SIGMA: f64 = 0.8;

/// Safety stock with and without lead-time variability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorBasedEstimate {
    pub no_var: f64,
    /// `None` when the history has no lead times
    pub with_var: Option<f64>,
}

/// `z * RMSE * sqrt(lead_time)`
pub fn rmse_safety_stock(
    history: &SeriesHistory,
    lead_time: f64,
    service_level: f64,
) -> Result<ErrorBasedEstimate> {
    estimate(history.rmse(), history.mae(), history, lead_time, service_level)
}

/// `z * (MAE / 0.8) * sqrt(lead_time)`
pub fn mae_safety_stock(
    history: &SeriesHistory,
    lead_time: f64,
    service_level: f64,
) -> Result<ErrorBasedEstimate> {
    let mae = history.mae();
    estimate(mae / MAE_TO_SIGMA, mae, history, lead_time, service_level)
}

fn estimate(
    sigma: f64,
    mean_abs_error: f64,
    history: &SeriesHistory,
    lead_time: f64,
    service_level: f64,
) -> Result<ErrorBasedEstimate> {
    let z = z_score(service_level)?;
    let with_var = history.lead_time_std_dev().map(|sigma_lt| {
        round2(z * (sigma.powi(2) * lead_time + sigma_lt.powi(2) * mean_abs_error.powi(2)).sqrt())
    });

    Ok(ErrorBasedEstimate {
        no_var: round2(z * sigma * lead_time.sqrt()),
        with_var,
    })
}
