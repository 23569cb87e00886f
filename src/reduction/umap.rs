//! UMAP — Uniform Manifold Approximation and Projection
//!
//! Compact UMAP (McInnes et al., 2018) for snapshot-scale inputs:
//! brute-force KNN graph, fuzzy simplicial set with binary-search sigma,
//! and SGD layout optimization with negative sampling.

use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// UMAP configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UmapConfig {
    /// Number of nearest neighbors (local vs global structure)
    pub n_neighbors: usize,
    /// Minimum distance between points in the embedding
    pub min_dist: f64,
    /// Number of output dimensions
    pub n_components: usize,
    /// Number of optimization epochs
    pub n_epochs: usize,
    /// SGD learning rate
    pub learning_rate: f64,
    /// Negative samples per positive edge
    pub negative_sample_rate: usize,
    /// Random seed for reproducibility
    pub random_state: u64,
}

impl Default for UmapConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            min_dist: 0.1,
            n_components: 3,
            n_epochs: 200,
            learning_rate: 1.0,
            negative_sample_rate: 5,
            random_state: 42,
        }
    }
}

/// An edge in the fuzzy simplicial set
struct Edge {
    i: usize,
    j: usize,
    weight: f64,
}

/// UMAP dimensionality reduction
pub struct Umap {
    config: UmapConfig,
}

impl Umap {
    /// Create a new UMAP instance
    pub fn new(config: UmapConfig) -> Self {
        Self { config }
    }

    /// Run UMAP on dense data. Returns an n x n_components embedding.
    /// Inputs too small for a neighborhood graph collapse to zeros.
    pub fn fit_transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let dims = self.config.n_components;
        if n < 3 {
            return Array2::zeros((n, dims));
        }

        let k = self.config.n_neighbors.min(n - 1);
        let (knn_indices, knn_distances) = compute_knn(x, k);
        let edges = compute_fuzzy_set(&knn_indices, &knn_distances, k);
        self.optimize_layout(n, &edges)
    }

    /// SGD layout optimization with negative sampling
    fn optimize_layout(&self, n_samples: usize, edges: &[Edge]) -> Array2<f64> {
        let dims = self.config.n_components;
        let (a, b) = find_ab_params(self.config.min_dist);

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
        let mut embedding: Vec<Vec<f64>> = (0..n_samples)
            .map(|_| (0..dims).map(|_| rng.gen_range(-0.1..0.1)).collect())
            .collect();

        let n_epochs = self.config.n_epochs;
        let neg_rate = self.config.negative_sample_rate;
        let max_weight = edges.iter().map(|e| e.weight).fold(0.0_f64, f64::max);

        for epoch in 0..n_epochs {
            let alpha = self.config.learning_rate * (1.0 - epoch as f64 / n_epochs as f64);
            if alpha < 1e-8 {
                break;
            }

            for edge in edges {
                // Sample edges proportionally to weight
                let epochs_per_sample = if edge.weight > 0.0 {
                    max_weight / edge.weight
                } else {
                    f64::INFINITY
                };
                if epoch as f64 % epochs_per_sample.max(1.0) >= 1.0 {
                    continue;
                }

                let (i, j) = (edge.i, edge.j);

                // Attractive force along the edge
                let dy: Vec<f64> = (0..dims).map(|d| embedding[i][d] - embedding[j][d]).collect();
                let dist_sq: f64 = dy.iter().map(|v| v * v).sum::<f64>() + 1e-8;
                let grad_coeff =
                    -2.0 * a * b * dist_sq.powf(b - 1.0) / (1.0 + a * dist_sq.powf(b));

                for d in 0..dims {
                    let g = (grad_coeff * dy[d]).clamp(-4.0, 4.0);
                    embedding[i][d] += alpha * g;
                    embedding[j][d] -= alpha * g;
                }

                // Repulsion from sampled non-neighbors
                for _ in 0..neg_rate {
                    let other = rng.gen_range(0..n_samples);
                    if other == i {
                        continue;
                    }
                    let dy_neg: Vec<f64> =
                        (0..dims).map(|d| embedding[i][d] - embedding[other][d]).collect();
                    let dist_sq_neg: f64 = dy_neg.iter().map(|v| v * v).sum::<f64>() + 1e-8;
                    let grad_coeff_neg =
                        2.0 * b / ((0.001 + dist_sq_neg) * (1.0 + a * dist_sq_neg.powf(b)));

                    for d in 0..dims {
                        embedding[i][d] += alpha * (grad_coeff_neg * dy_neg[d]).clamp(-4.0, 4.0);
                    }
                }

                for d in 0..dims {
                    embedding[i][d] = embedding[i][d].clamp(-10.0, 10.0);
                    embedding[j][d] = embedding[j][d].clamp(-10.0, 10.0);
                }
            }
        }

        let mut out = Array2::zeros((n_samples, dims));
        for (i, row) in embedding.into_iter().enumerate() {
            for (d, v) in row.into_iter().enumerate() {
                out[[i, d]] = v;
            }
        }
        out
    }
}

/// Brute-force KNN, parallelized over samples
fn compute_knn(x: &Array2<f64>, k: usize) -> (Vec<Vec<usize>>, Vec<Vec<f64>>) {
    let n = x.nrows();

    let results: Vec<(Vec<usize>, Vec<f64>)> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut neighbors: Vec<(usize, f64)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| {
                    let d: f64 = x
                        .row(i)
                        .iter()
                        .zip(x.row(j).iter())
                        .map(|(&a, &b)| (a - b).powi(2))
                        .sum::<f64>()
                        .sqrt();
                    (j, d)
                })
                .collect();
            neighbors
                .sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
            neighbors.truncate(k);

            let indices: Vec<usize> = neighbors.iter().map(|&(j, _)| j).collect();
            let distances: Vec<f64> = neighbors.iter().map(|&(_, d)| d).collect();
            (indices, distances)
        })
        .collect();

    let mut knn_indices = Vec::with_capacity(n);
    let mut knn_distances = Vec::with_capacity(n);
    for (idx, dist) in results {
        knn_indices.push(idx);
        knn_distances.push(dist);
    }
    (knn_indices, knn_distances)
}

/// Fuzzy simplicial set: per-point rho and binary-search sigma, then
/// symmetrized edge weights
fn compute_fuzzy_set(
    knn_indices: &[Vec<usize>],
    knn_distances: &[Vec<f64>],
    k: usize,
) -> Vec<Edge> {
    let n = knn_indices.len();
    let target = (k as f64).ln() / std::f64::consts::LN_2; // log2(k)

    let params: Vec<(f64, f64)> = (0..n)
        .into_par_iter()
        .map(|i| {
            let dists = &knn_distances[i];
            let rho = if dists.is_empty() { 0.0 } else { dists[0].max(1e-12) };

            let mut lo = 1e-8_f64;
            let mut hi = 1000.0_f64;
            let mut sigma = 1.0;
            for _ in 0..64 {
                sigma = (lo + hi) / 2.0;
                let sum: f64 = dists
                    .iter()
                    .map(|&d| (-(d - rho).max(0.0) / sigma).exp())
                    .sum();
                if (sum - target).abs() < 1e-5 {
                    break;
                }
                if sum > target {
                    hi = sigma;
                } else {
                    lo = sigma;
                }
            }
            (rho, sigma)
        })
        .collect();

    let mut edge_map: HashMap<(usize, usize), f64> = HashMap::with_capacity(n * k * 2);
    for i in 0..n {
        let (rho, sigma) = params[i];
        for (idx, (&j, &d)) in knn_indices[i].iter().zip(knn_distances[i].iter()).enumerate() {
            let w = if idx == 0 {
                1.0 // nearest neighbor always has weight 1
            } else {
                (-(d - rho).max(0.0) / sigma.max(1e-12)).exp()
            };
            edge_map.insert((i, j), w);
        }
    }

    // Symmetrize: w_sym(i,j) = w(i,j) + w(j,i) - w(i,j) * w(j,i)
    let mut symmetric: HashMap<(usize, usize), f64> = HashMap::with_capacity(edge_map.len());
    for (&(i, j), &w_ij) in &edge_map {
        let key = if i < j { (i, j) } else { (j, i) };
        let w_ji = edge_map.get(&(j, i)).copied().unwrap_or(0.0);
        let w_sym = w_ij + w_ji - w_ij * w_ji;
        symmetric
            .entry(key)
            .and_modify(|w| *w = w.max(w_sym))
            .or_insert(w_sym);
    }

    let mut edges: Vec<Edge> = symmetric
        .into_iter()
        .filter(|(_, w)| *w > 1e-8)
        .map(|((i, j), weight)| Edge { i, j, weight })
        .collect();
    // HashMap iteration order is per-instance random; sort so the SGD edge
    // order (and thus the seeded RNG stream) is reproducible.
    edges.sort_by_key(|e| (e.i, e.j));
    edges
}

/// Parameters a, b for the embedding curve 1 / (1 + a * d^(2b)),
/// approximating a smooth step at min_dist
fn find_ab_params(min_dist: f64) -> (f64, f64) {
    let b = 1.0;
    let a = if min_dist > 0.0 {
        (2.0_f64.powf(2.0 * b) - 1.0) / min_dist.powf(2.0 * b)
    } else {
        1.0
    };
    (a, b)
}
