//! PCA — linear projection onto directions of maximal variance
//!
//! Top-k eigenvectors of the covariance matrix via power iteration with
//! deflation. Data is centered but not scaled, so component loadings stay
//! in the units of the original features and remain interpretable.

use ndarray::Array2;
use rayon::prelude::*;

const MAX_ITER: usize = 300;
const TOL: f64 = 1e-10;

/// Output of a PCA fit
pub(crate) struct PcaFit {
    /// Projected data, n x k
    pub positions: Array2<f64>,
    /// Fraction of total variance per component, non-negative, sums to <= 1
    pub explained_variance: Vec<f64>,
    /// Component loadings, k vectors of length n_features
    pub components: Vec<Vec<f64>>,
}

/// Center `x` and project it onto its top `k` principal axes.
/// Degenerate inputs (a single row, zero variance) yield zero eigenvalues
/// and an all-zero projection rather than an error.
pub(crate) fn fit_transform(x: &Array2<f64>, k: usize) -> PcaFit {
    let (n, d) = (x.nrows(), x.ncols());
    let k = k.min(d).max(1);

    // Center columns
    let means: Vec<f64> = (0..d)
        .map(|j| x.column(j).sum() / (n as f64).max(1.0))
        .collect();
    let mut centered = x.clone();
    for j in 0..d {
        centered.column_mut(j).mapv_inplace(|v| v - means[j]);
    }

    let cov = covariance(&centered, d);
    let (eigenvalues, eigenvectors) = power_iteration(&cov, d, k);

    let full_variance: f64 = (0..d).map(|i| cov[i * d + i]).sum::<f64>().max(1e-12);
    let explained_variance: Vec<f64> = eigenvalues
        .iter()
        .map(|&ev| (ev / full_variance).max(0.0))
        .collect();

    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let sample = centered.row(i);
            eigenvectors
                .iter()
                .map(|component| {
                    sample
                        .iter()
                        .zip(component.iter())
                        .map(|(&a, &b)| a * b)
                        .sum()
                })
                .collect()
        })
        .collect();

    let mut positions = Array2::zeros((n, k));
    for (i, row) in rows.into_iter().enumerate() {
        for (j, v) in row.into_iter().enumerate() {
            positions[[i, j]] = v;
        }
    }

    PcaFit {
        positions,
        explained_variance,
        components: eigenvectors,
    }
}

/// Covariance matrix (d x d) of centered data, stored as a flat row-major Vec
fn covariance(centered: &Array2<f64>, d: usize) -> Vec<f64> {
    let n = centered.nrows() as f64;
    let mut cov = vec![0.0f64; d * d];

    for i in 0..d {
        for j in i..d {
            let dot: f64 = centered
                .column(i)
                .iter()
                .zip(centered.column(j).iter())
                .map(|(&a, &b)| a * b)
                .sum();
            let val = dot / (n - 1.0).max(1.0);
            cov[i * d + j] = val;
            cov[j * d + i] = val;
        }
    }

    cov
}

/// Power iteration with deflation to extract the top-k eigenpairs
fn power_iteration(cov: &[f64], d: usize, k: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
    let mut eigenvalues = Vec::with_capacity(k);
    let mut eigenvectors: Vec<Vec<f64>> = Vec::with_capacity(k);

    // Work on a copy so we can deflate
    let mut work = cov.to_vec();

    for component in 0..k {
        // Deterministic non-degenerate start vector
        let mut v: Vec<f64> = (0..d)
            .map(|i| if i == component % d { 1.0 } else { 0.5 / (i + 1) as f64 })
            .collect();
        let norm = dot(&v, &v).sqrt().max(1e-12);
        v.iter_mut().for_each(|x| *x /= norm);

        let mut eigenvalue = 0.0f64;

        for _ in 0..MAX_ITER {
            // w = A * v
            let mut w = vec![0.0f64; d];
            for (i, wi) in w.iter_mut().enumerate() {
                *wi = dot(&work[i * d..(i + 1) * d], &v);
            }

            let new_eigenvalue = dot(&v, &w);
            let w_norm = dot(&w, &w).sqrt().max(1e-12);
            let new_v: Vec<f64> = w.iter().map(|&x| x / w_norm).collect();

            let diff: f64 = v
                .iter()
                .zip(new_v.iter())
                .map(|(&a, &b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();

            v = new_v;
            eigenvalue = new_eigenvalue;

            if diff < TOL {
                break;
            }
        }

        eigenvalue = eigenvalue.max(0.0);
        eigenvalues.push(eigenvalue);
        eigenvectors.push(v.clone());

        // Deflate: A = A - eigenvalue * v * v^T
        for i in 0..d {
            for j in 0..d {
                work[i * d + j] -= eigenvalue * v[i] * v[j];
            }
        }
    }

    (eigenvalues, eigenvectors)
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
}
