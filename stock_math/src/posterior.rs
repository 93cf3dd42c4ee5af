//! Posterior sampling for a Normal error model
//!
//! Observations are modelled as `Normal(mu, sigma)` with weakly-informative
//! priors `mu ~ Normal(0, prior_mu_scale)` and
//! `sigma ~ HalfNormal(prior_sigma_scale)`. Draws are produced by a
//! component-wise random-walk Metropolis sampler on `(mu, ln sigma)` whose step
//! sizes adapt during the tuning phase. Chains are seeded from
//! [`SamplerParams::seed`] so results are reproducible.

use crate::stats::{mean, population_std_dev};
use crate::{MathError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Target acceptance rate for each one-dimensional update
const TARGET_ACCEPTANCE: f64 = 0.44;
/// Tuning iterations between step-size adjustments
const ADAPT_WINDOW: usize = 50;

/// Sampler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerParams {
    /// Retained draws per chain
    pub draws: usize,
    /// Discarded tuning iterations per chain
    pub tune: usize,
    /// Number of independent chains
    pub chains: usize,
    /// Base seed; chain `c` uses `seed + c`
    pub seed: u64,
    /// Scale of the Normal prior on `mu`
    pub prior_mu_scale: f64,
    /// Scale of the HalfNormal prior on `sigma`
    pub prior_sigma_scale: f64,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            draws: 2000,
            tune: 1000,
            chains: 2,
            seed: 42,
            prior_mu_scale: 5.0,
            prior_sigma_scale: 5.0,
        }
    }
}

/// Pooled posterior draws from all chains
#[derive(Debug, Clone)]
pub struct PosteriorDraws {
    /// Draws of the location parameter
    pub mu: Vec<f64>,
    /// Draws of the scale parameter
    pub sigma: Vec<f64>,
    /// Fraction of accepted proposals after tuning
    pub acceptance_rate: f64,
}

impl PosteriorDraws {
    /// Posterior mean of `sigma`
    pub fn mean_sigma(&self) -> f64 {
        mean(&self.sigma).unwrap_or(0.0)
    }

    /// Posterior mean of `mu`
    pub fn mean_mu(&self) -> f64 {
        mean(&self.mu).unwrap_or(0.0)
    }
}

/// Metropolis sampler for the Normal error model
#[derive(Debug, Clone)]
pub struct NormalPosteriorSampler {
    params: SamplerParams,
}

impl NormalPosteriorSampler {
    /// Create a sampler after validating its settings
    pub fn new(params: SamplerParams) -> Result<Self> {
        if params.draws == 0 || params.chains == 0 {
            return Err(MathError::InvalidInput(
                "Sampler needs at least one chain and one draw".to_string(),
            ));
        }
        if params.prior_mu_scale <= 0.0 || params.prior_sigma_scale <= 0.0 {
            return Err(MathError::InvalidInput(
                "Prior scales must be greater than zero".to_string(),
            ));
        }

        Ok(Self { params })
    }

    /// Draw from the posterior of `(mu, sigma)` given `observations`
    pub fn sample(&self, observations: &[f64]) -> Result<PosteriorDraws> {
        if observations.is_empty() {
            return Err(MathError::InsufficientData(
                "Posterior sampling needs at least one observation".to_string(),
            ));
        }
        if observations.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Observations must be finite".to_string(),
            ));
        }

        let capacity = self.params.draws * self.params.chains;
        let mut pooled = PosteriorDraws {
            mu: Vec::with_capacity(capacity),
            sigma: Vec::with_capacity(capacity),
            acceptance_rate: 0.0,
        };
        let mut accepted = 0usize;

        for chain in 0..self.params.chains {
            let seed = self.params.seed.wrapping_add(chain as u64);
            accepted += self.run_chain(observations, seed, &mut pooled);
        }

        // two proposals (mu, ln sigma) per retained iteration
        pooled.acceptance_rate = accepted as f64 / (2 * capacity) as f64;
        Ok(pooled)
    }

    fn run_chain(&self, observations: &[f64], seed: u64, out: &mut PosteriorDraws) -> usize {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = observations.len() as f64;

        let spread = population_std_dev(observations).unwrap_or(0.0).max(1e-3);
        let mut state = [mean(observations).unwrap_or(0.0), spread.ln()];
        let mut step = [spread / n.sqrt(), 1.0 / (2.0 * n).sqrt()];
        let mut current = self.log_posterior(observations, state[0], state[1]);

        let mut window_accepts = [0usize; 2];
        let mut retained_accepts = 0usize;

        for iteration in 0..self.params.tune + self.params.draws {
            for dim in 0..2 {
                let noise: f64 = rng.sample(StandardNormal);
                let mut proposal = state;
                proposal[dim] += step[dim] * noise;

                let candidate = self.log_posterior(observations, proposal[0], proposal[1]);
                let log_u: f64 = rng.gen::<f64>().ln();
                if log_u < candidate - current {
                    state = proposal;
                    current = candidate;
                    if iteration < self.params.tune {
                        window_accepts[dim] += 1;
                    } else {
                        retained_accepts += 1;
                    }
                }
            }

            if iteration < self.params.tune && (iteration + 1) % ADAPT_WINDOW == 0 {
                for dim in 0..2 {
                    let rate = window_accepts[dim] as f64 / ADAPT_WINDOW as f64;
                    step[dim] *= if rate > TARGET_ACCEPTANCE { 1.25 } else { 0.8 };
                    window_accepts[dim] = 0;
                }
            }

            if iteration >= self.params.tune {
                out.mu.push(state[0]);
                out.sigma.push(state[1].exp());
            }
        }

        retained_accepts
    }

    /// Unnormalized log density of `(mu, ln sigma)`, including the Jacobian
    /// of the log transform.
    fn log_posterior(&self, observations: &[f64], mu: f64, log_sigma: f64) -> f64 {
        let sigma = log_sigma.exp();
        if !sigma.is_finite() || sigma <= 0.0 {
            return f64::NEG_INFINITY;
        }

        let n = observations.len() as f64;
        let squared: f64 = observations.iter().map(|&x| (x - mu).powi(2)).sum();
        let log_likelihood = -n * log_sigma - squared / (2.0 * sigma * sigma);

        let mu_scale = self.params.prior_mu_scale;
        let sigma_scale = self.params.prior_sigma_scale;
        let log_prior_mu = -(mu * mu) / (2.0 * mu_scale * mu_scale);
        let log_prior_sigma = -(sigma * sigma) / (2.0 * sigma_scale * sigma_scale);

        log_likelihood + log_prior_mu + log_prior_sigma + log_sigma
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_posterior_prefers_data_scale() {
        let sampler = NormalPosteriorSampler::new(SamplerParams::default()).unwrap();
        let obs = [-2.0, -1.0, 0.0, 1.0, 2.0];
        let near = sampler.log_posterior(&obs, 0.0, 1.5_f64.ln());
        let far = sampler.log_posterior(&obs, 0.0, 40.0_f64.ln());
        assert!(near > far);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let params = SamplerParams {
            chains: 0,
            ..SamplerParams::default()
        };
        assert!(NormalPosteriorSampler::new(params).is_err());

        let params = SamplerParams {
            prior_sigma_scale: 0.0,
            ..SamplerParams::default()
        };
        assert!(NormalPosteriorSampler::new(params).is_err());
    }
}
