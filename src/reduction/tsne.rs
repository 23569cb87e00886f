//! t-SNE — t-distributed stochastic neighbor embedding
//!
//! Exact (quadratic) t-SNE: perplexity-calibrated Gaussian affinities via
//! binary-search precision, symmetrized joint probabilities, and gradient
//! descent with momentum and early exaggeration. Sized for snapshot-scale
//! inputs (tens to a few hundred points), not bulk corpora.

use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// t-SNE configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsneConfig {
    /// Target perplexity (effective neighbor count); clamped to n-1
    pub perplexity: f64,
    /// Number of output dimensions
    pub n_components: usize,
    /// Gradient descent epochs
    pub n_epochs: usize,
    /// Gradient descent step size
    pub learning_rate: f64,
    /// Affinity multiplier during the early exaggeration phase
    pub early_exaggeration: f64,
    /// Epochs spent in the early exaggeration phase
    pub exaggeration_epochs: usize,
    /// Random seed for the initial layout
    pub random_state: u64,
}

impl Default for TsneConfig {
    fn default() -> Self {
        Self {
            perplexity: 15.0,
            n_components: 3,
            n_epochs: 300,
            learning_rate: 100.0,
            early_exaggeration: 4.0,
            exaggeration_epochs: 50,
            random_state: 42,
        }
    }
}

/// t-SNE dimensionality reduction
pub struct Tsne {
    config: TsneConfig,
}

impl Tsne {
    /// Create a new t-SNE instance
    pub fn new(config: TsneConfig) -> Self {
        Self { config }
    }

    /// Run t-SNE on dense data. Returns an n x n_components embedding.
    pub fn fit_transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let dims = self.config.n_components;
        if n <= 1 {
            return Array2::zeros((n, dims));
        }

        let p = self.joint_probabilities(x);

        // Small random initial layout
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
        let mut y: Vec<Vec<f64>> = (0..n)
            .map(|_| (0..dims).map(|_| rng.gen_range(-1e-2..1e-2)).collect())
            .collect();
        let mut velocity = vec![vec![0.0f64; dims]; n];

        for epoch in 0..self.config.n_epochs {
            let exaggeration = if epoch < self.config.exaggeration_epochs {
                self.config.early_exaggeration
            } else {
                1.0
            };
            let momentum = if epoch < self.config.exaggeration_epochs {
                0.5
            } else {
                0.8
            };

            // Student-t kernel weights and their normalizer
            let mut w = vec![0.0f64; n * n];
            let mut z = 0.0f64;
            for i in 0..n {
                for j in (i + 1)..n {
                    let d2: f64 = (0..dims).map(|k| (y[i][k] - y[j][k]).powi(2)).sum();
                    let wij = 1.0 / (1.0 + d2);
                    w[i * n + j] = wij;
                    w[j * n + i] = wij;
                    z += 2.0 * wij;
                }
            }
            let z = z.max(1e-12);

            for i in 0..n {
                let mut grad = vec![0.0f64; dims];
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let wij = w[i * n + j];
                    let coeff = 4.0 * (exaggeration * p[i * n + j] - wij / z) * wij;
                    for (k, g) in grad.iter_mut().enumerate() {
                        *g += coeff * (y[i][k] - y[j][k]);
                    }
                }
                for k in 0..dims {
                    velocity[i][k] = momentum * velocity[i][k]
                        - self.config.learning_rate * grad[k];
                    y[i][k] += velocity[i][k];
                }
            }
        }

        let mut out = Array2::zeros((n, dims));
        for (i, row) in y.into_iter().enumerate() {
            for (k, v) in row.into_iter().enumerate() {
                out[[i, k]] = v;
            }
        }
        out
    }

    /// Symmetrized joint probabilities from perplexity-calibrated Gaussian
    /// conditionals, as a flat n x n matrix
    fn joint_probabilities(&self, x: &Array2<f64>) -> Vec<f64> {
        let n = x.nrows();
        let d2 = pairwise_sq_dists(x);
        let perplexity = self.config.perplexity.min((n - 1) as f64).max(1.0);
        let target_entropy = perplexity.ln();

        // Per-point precision via binary search on the conditional entropy
        let conditionals: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut beta = 1.0f64;
                let mut lo = 0.0f64;
                let mut hi = f64::INFINITY;
                let mut row = vec![0.0f64; n];

                for _ in 0..64 {
                    let mut sum = 0.0f64;
                    for j in 0..n {
                        row[j] = if j == i {
                            0.0
                        } else {
                            (-beta * d2[i * n + j]).exp()
                        };
                        sum += row[j];
                    }
                    let sum = sum.max(1e-300);
                    let entropy: f64 = row
                        .iter()
                        .enumerate()
                        .filter(|&(j, &v)| j != i && v > 0.0)
                        .map(|(j, &v)| {
                            let pj = v / sum;
                            pj * (beta * d2[i * n + j] + sum.ln())
                        })
                        .sum();

                    let diff = entropy - target_entropy;
                    if diff.abs() < 1e-5 {
                        break;
                    }
                    if diff > 0.0 {
                        lo = beta;
                        beta = if hi.is_finite() { (lo + hi) / 2.0 } else { beta * 2.0 };
                    } else {
                        hi = beta;
                        beta = (lo + hi) / 2.0;
                    }
                }

                let sum: f64 = row.iter().sum::<f64>().max(1e-300);
                row.iter().map(|&v| v / sum).collect()
            })
            .collect();

        // Symmetrize and normalize over all pairs
        let mut p = vec![0.0f64; n * n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    p[i * n + j] =
                        ((conditionals[i][j] + conditionals[j][i]) / (2.0 * n as f64)).max(1e-12);
                }
            }
        }
        p
    }
}

fn pairwise_sq_dists(x: &Array2<f64>) -> Vec<f64> {
    let n = x.nrows();
    let mut d2 = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let dist: f64 = x
                .row(i)
                .iter()
                .zip(x.row(j).iter())
                .map(|(&a, &b)| (a - b).powi(2))
                .sum();
            d2[i * n + j] = dist;
            d2[j * n + i] = dist;
        }
    }
    d2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_clusters() -> Array2<f64> {
        let mut x = Array2::zeros((12, 4));
        for i in 0..6 {
            for j in 0..4 {
                x[[i, j]] = (i as f64) * 0.01 + (j as f64) * 0.02;
                x[[i + 6, j]] = 50.0 + (i as f64) * 0.01 + (j as f64) * 0.03;
            }
        }
        x
    }

    #[test]
    fn test_output_shape() {
        let x = two_clusters();
        let emb = Tsne::new(TsneConfig::default()).fit_transform(&x);
        assert_eq!(emb.shape(), &[12, 3]);
        assert!(emb.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_clusters_stay_separated() {
        let x = two_clusters();
        let emb = Tsne::new(TsneConfig::default()).fit_transform(&x);

        let centroid = |range: std::ops::Range<usize>| -> Vec<f64> {
            let mut c = vec![0.0; 3];
            for i in range.clone() {
                for k in 0..3 {
                    c[k] += emb[[i, k]] / range.len() as f64;
                }
            }
            c
        };
        let a = centroid(0..6);
        let b = centroid(6..12);
        let between: f64 = (0..3).map(|k| (a[k] - b[k]).powi(2)).sum::<f64>().sqrt();

        // Mean within-cluster spread should be smaller than the gap
        let spread: f64 = (0..6)
            .map(|i| (0..3).map(|k| (emb[[i, k]] - a[k]).powi(2)).sum::<f64>().sqrt())
            .sum::<f64>()
            / 6.0;
        assert!(
            between > spread,
            "clusters should separate: gap {between}, spread {spread}"
        );
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let x = two_clusters();
        let a = Tsne::new(TsneConfig::default()).fit_transform(&x);
        let b = Tsne::new(TsneConfig::default()).fit_transform(&x);
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_point() {
        let x = Array2::zeros((1, 5));
        let emb = Tsne::new(TsneConfig::default()).fit_transform(&x);
        assert_eq!(emb.shape(), &[1, 3]);
    }
}
