//! # Stock Math
//!
//! Statistical calculations used by safety-stock estimators.
//! This crate provides descriptive statistics, service-level z-scores,
//! a seeded random-forest regressor and a seeded Metropolis sampler for
//! a Normal error model.

use thiserror::Error;

pub mod forest;
pub mod posterior;
pub mod stats;

pub use forest::{ForestParams, RandomForestRegressor};
pub use posterior::{NormalPosteriorSampler, PosteriorDraws, SamplerParams};
pub use stats::{mean, normalize_service_level, population_std_dev, round2, z_score};

/// Errors that can occur in statistical calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for stock math operations
pub type Result<T> = std::result::Result<T, MathError>;
