//! Descriptive statistics and service-level helpers
//!
//! All dispersion measures use the population form (divide by `n`), matching
//! how demand variability is estimated for safety stock.

use crate::{MathError, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Lowest service level accepted after normalization
pub const MIN_SERVICE_LEVEL: f64 = 0.5;
/// Highest service level accepted after normalization
pub const MAX_SERVICE_LEVEL: f64 = 0.999;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (ddof = 0), `None` for an empty slice
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let variance = values
        .iter()
        .map(|&v| {
            let diff = v - avg;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;

    Some(variance.sqrt())
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Bring a service level onto the probability scale.
///
/// Values above 1 are read as percentages (95 -> 0.95). The result is clipped
/// to `[MIN_SERVICE_LEVEL, MAX_SERVICE_LEVEL]`. NaN is returned unchanged.
pub fn normalize_service_level(value: f64) -> f64 {
    if value.is_nan() {
        return value;
    }
    let probability = if value > 1.0 { value / 100.0 } else { value };
    probability.clamp(MIN_SERVICE_LEVEL, MAX_SERVICE_LEVEL)
}

/// Safety factor for a service level: the inverse standard normal CDF.
///
/// The service level is normalized first, so `95.0` and `0.95` give the same
/// z-score (about 1.645).
pub fn z_score(service_level: f64) -> Result<f64> {
    if !service_level.is_finite() {
        return Err(MathError::InvalidInput(format!(
            "Service level must be a finite number, got {}",
            service_level
        )));
    }

    let standard_normal = Normal::new(0.0, 1.0)
        .map_err(|e| MathError::CalculationError(format!("Standard normal: {}", e)))?;

    Ok(standard_normal.inverse_cdf(normalize_service_level(service_level)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std_dev() {
        let values = [90.0, 110.0, 100.0];
        assert_relative_eq!(mean(&values).unwrap(), 100.0);
        assert_relative_eq!(
            population_std_dev(&values).unwrap(),
            8.164965809,
            epsilon = 1e-8
        );
        assert!(mean(&[]).is_none());
        assert!(population_std_dev(&[]).is_none());
    }

    #[test]
    fn test_single_value_has_zero_spread() {
        assert_relative_eq!(population_std_dev(&[42.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_round2() {
        assert_relative_eq!(round2(29.6073), 29.61);
        assert_relative_eq!(round2(-3.14159), -3.14);
        assert_relative_eq!(round2(8.164965), 8.16);
    }

    #[test]
    fn test_service_level_normalization() {
        assert_relative_eq!(normalize_service_level(95.0), 0.95);
        assert_relative_eq!(normalize_service_level(0.95), 0.95);
        assert_relative_eq!(normalize_service_level(100.0), MAX_SERVICE_LEVEL);
        assert_relative_eq!(normalize_service_level(0.2), MIN_SERVICE_LEVEL);
        assert!(normalize_service_level(f64::NAN).is_nan());
    }

    #[test]
    fn test_z_score() {
        assert_relative_eq!(z_score(0.95).unwrap(), 1.6448536, epsilon = 1e-6);
        assert_relative_eq!(z_score(95.0).unwrap(), 1.6448536, epsilon = 1e-6);
        assert_relative_eq!(z_score(0.5).unwrap(), 0.0, epsilon = 1e-9);
        assert!(z_score(f64::NAN).is_err());
    }
}
