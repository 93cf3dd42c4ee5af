//! Random forest regression
//!
//! Bagged CART regression trees. Each tree is grown on a bootstrap sample
//! with variance-reduction splits over all features; the forest prediction is
//! the mean of the tree predictions. All randomness comes from a single
//! `StdRng` seeded from [`ForestParams::seed`], so a fit is reproducible.

use crate::{MathError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Hyper-parameters for [`RandomForestRegressor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees in the ensemble
    pub n_trees: usize,
    /// Maximum tree depth, unbounded when `None`
    pub max_depth: Option<usize>,
    /// Minimum number of samples a node needs before it may be split
    pub min_samples_split: usize,
    /// Seed for bootstrap sampling
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single regression tree stored as a flat node arena, root at index 0
#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    sse: f64,
}

struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    max_depth: Option<usize>,
    min_samples_split: usize,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self, samples: Vec<usize>) -> RegressionTree {
        self.grow(samples, 0);
        RegressionTree { nodes: self.nodes }
    }

    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        let leaf_value = self.mean_target(&samples);
        self.nodes.push(Node::Leaf(leaf_value));

        let depth_exhausted = self.max_depth.map_or(false, |max| depth >= max);
        if depth_exhausted || samples.len() < self.min_samples_split {
            return idx;
        }

        let parent_sse = self.sse(&samples);
        if parent_sse <= f64::EPSILON {
            return idx;
        }

        let Some(best) = self.best_split(&samples) else {
            return idx;
        };
        if best.sse >= parent_sse - 1e-12 {
            return idx;
        }

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&s| self.features[s][best.feature] <= best.threshold);

        let left = self.grow(left_samples, depth + 1);
        let right = self.grow(right_samples, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn mean_target(&self, samples: &[usize]) -> f64 {
        samples.iter().map(|&s| self.targets[s]).sum::<f64>() / samples.len() as f64
    }

    fn sse(&self, samples: &[usize]) -> f64 {
        let mean = self.mean_target(samples);
        samples
            .iter()
            .map(|&s| (self.targets[s] - mean).powi(2))
            .sum()
    }

    fn best_split(&self, samples: &[usize]) -> Option<SplitCandidate> {
        let n_features = self.features[samples[0]].len();
        let total_sum: f64 = samples.iter().map(|&s| self.targets[s]).sum();
        let total_sq: f64 = samples.iter().map(|&s| self.targets[s].powi(2)).sum();
        let n = samples.len() as f64;

        let mut best: Option<SplitCandidate> = None;
        let mut order = samples.to_vec();

        for feature in 0..n_features {
            order.sort_by(|&a, &b| {
                self.features[a][feature].total_cmp(&self.features[b][feature])
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for i in 0..order.len() - 1 {
                let y = self.targets[order[i]];
                left_sum += y;
                left_sq += y * y;

                let here = self.features[order[i]][feature];
                let next = self.features[order[i + 1]][feature];
                if next <= here {
                    continue;
                }

                let left_n = (i + 1) as f64;
                let right_n = n - left_n;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n)
                    + (right_sq - right_sum * right_sum / right_n);

                if best.as_ref().map_or(true, |b| sse < b.sse) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (here + next) / 2.0,
                        sse,
                    });
                }
            }
        }

        best
    }
}

/// Bagged regression-tree ensemble
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    params: ForestParams,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Create an unfitted forest with the given parameters
    pub fn new(params: ForestParams) -> Result<Self> {
        if params.n_trees == 0 {
            return Err(MathError::InvalidInput(
                "Forest needs at least one tree".to_string(),
            ));
        }
        if params.min_samples_split < 2 {
            return Err(MathError::InvalidInput(
                "min_samples_split must be at least 2".to_string(),
            ));
        }

        Ok(Self {
            params,
            trees: Vec::new(),
            n_features: 0,
        })
    }

    /// Fit the forest on row-major `features` and `targets`
    pub fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        if features.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot fit a forest on zero rows".to_string(),
            ));
        }
        if features.len() != targets.len() {
            return Err(MathError::InvalidInput(format!(
                "Feature rows ({}) and targets ({}) differ in length",
                features.len(),
                targets.len()
            )));
        }

        let n_features = features[0].len();
        if features.iter().any(|row| row.len() != n_features) {
            return Err(MathError::InvalidInput(
                "All feature rows must have the same width".to_string(),
            ));
        }
        if features.iter().flatten().chain(targets).any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Features and targets must be finite".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let n = features.len();

        self.trees = (0..self.params.n_trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                TreeBuilder {
                    features,
                    targets,
                    max_depth: self.params.max_depth,
                    min_samples_split: self.params.min_samples_split,
                    nodes: Vec::new(),
                }
                .build(bootstrap)
            })
            .collect();
        self.n_features = n_features;

        Ok(())
    }

    /// Predict one value per row
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(MathError::CalculationError(
                "Forest has not been fitted".to_string(),
            ));
        }

        features
            .iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(MathError::InvalidInput(format!(
                        "Expected {} features, got {}",
                        self.n_features,
                        row.len()
                    )));
                }
                let total: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
                Ok(total / self.trees.len() as f64)
            })
            .collect()
    }

    /// Number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
