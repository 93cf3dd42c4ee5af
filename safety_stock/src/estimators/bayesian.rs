//! Bayesian safety stock
//!
//! Forecast errors of a series are modelled as `Normal(mu, sigma)` with
//! `mu ~ Normal(0, 5)` and `sigma ~ HalfNormal(5)`. The posterior mean of
//! `sigma` replaces the demand deviation in `z * sigma * sqrt(lead_time)`.

use super::{
    for_each_series, group_future, required_lead_time, required_service_level, HistoryIndex,
    KeyedEstimate,
};
use crate::config::BayesianConfig;
use crate::Result;
use forecast_accuracy::{FutureRecord, HistoryRecord};
use stock_math::{round2, z_score, NormalPosteriorSampler};
use tracing::{debug, info};

/// Bayesian safety stock for every future row whose series has history.
///
/// Series with fewer than `config.min_history` error observations get 0.
pub fn bayesian_table(
    history: &[HistoryRecord],
    future: &[FutureRecord],
    config: &BayesianConfig,
    parallel: bool,
) -> Result<Vec<KeyedEstimate>> {
    let sampler = NormalPosteriorSampler::new(config.sampler.clone())?;
    let index = HistoryIndex::new(history);
    let groups = group_future(future);

    info!(
        series = groups.len(),
        draws = config.sampler.draws,
        chains = config.sampler.chains,
        "running Bayesian estimator"
    );

    for_each_series(&groups, parallel, |key, rows| {
        let series = index.series(key);
        if series.is_empty() {
            return Ok(Vec::new());
        }

        // actual - forecast; only the spread matters here
        let errors: Vec<f64> = series.errors().iter().map(|e| -e).collect();
        let sigma = if errors.len() < config.min_history {
            debug!(series = %key, observations = errors.len(), "too few errors, safety stock 0");
            None
        } else {
            let draws = sampler.sample(&errors)?;
            debug!(
                series = %key,
                posterior_sigma = draws.mean_sigma(),
                acceptance = draws.acceptance_rate,
                "sampled error posterior"
            );
            Some(draws.mean_sigma())
        };

        rows.iter()
            .map(|row| {
                let value = match sigma {
                    Some(sigma) => {
                        let z = z_score(required_service_level(row)?)?;
                        round2(z * sigma * required_lead_time(row)?.sqrt())
                    }
                    None => 0.0,
                };
                Ok(KeyedEstimate {
                    key: row.key.clone(),
                    date: row.date,
                    value,
                })
            })
            .collect()
    })
}
