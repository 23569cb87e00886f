//! Dimensionality reduction with interpretability metadata
//!
//! Maps an (entities x features) matrix onto a small number of axes and
//! reports, where the method defines them, per-axis explained variance and
//! the features contributing most to each axis. Nonlinear methods return
//! those fields as `None` rather than zero-filled: undefined is not zero.

mod pca;
mod tsne;
#[cfg(feature = "umap")]
mod umap;

pub use tsne::{Tsne, TsneConfig};
#[cfg(feature = "umap")]
pub use umap::{Umap, UmapConfig};

use crate::error::{MorphError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of feature names reported per axis for linear methods
const TOP_FEATURES_PER_AXIS: usize = 3;

/// Reduction method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReduceMethod {
    /// Linear projection onto directions of maximal variance
    Pca,
    /// t-distributed stochastic neighbor embedding
    Tsne,
    /// Uniform manifold approximation and projection
    Umap,
}

impl FromStr for ReduceMethod {
    type Err = MorphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pca" => Ok(Self::Pca),
            "tsne" | "t-sne" => Ok(Self::Tsne),
            "umap" => Ok(Self::Umap),
            other => Err(MorphError::InvalidInput(format!(
                "Unknown reduction method '{other}'. Supported: pca, tsne, umap"
            ))),
        }
    }
}

/// Result of one reduction call. Metadata fields are present only for
/// methods that define them.
#[derive(Debug, Clone)]
pub struct ReductionResult {
    /// Embedded positions, N x target_dims
    pub positions: Array2<f64>,
    /// Per-axis fraction of total variance captured (sums to <= 1)
    pub explained_variance: Option<Vec<f64>>,
    /// Per-axis feature names ordered by descending absolute contribution
    pub top_features: Option<Vec<Vec<String>>>,
}

/// Reduce `x` to `target_dims` axes.
///
/// When the input already has `target_dims` or fewer features no real
/// reduction happens: the matrix is passed through (zero-padded if
/// narrower) with uniform variance ratios and one contributing feature per
/// axis, so downstream labeling stays uniform.
pub fn reduce(
    x: &Array2<f64>,
    method: ReduceMethod,
    target_dims: usize,
    feature_names: Option<&[String]>,
) -> Result<ReductionResult> {
    let n_features = x.ncols();
    let names: Vec<String> = match feature_names {
        Some(names) => names.to_vec(),
        None => (0..n_features).map(|i| format!("feat_{i}")).collect(),
    };
    if names.len() != n_features {
        return Err(MorphError::ShapeError {
            expected: format!("{n_features} feature names"),
            actual: format!("{}", names.len()),
        });
    }

    if n_features <= target_dims {
        return Ok(passthrough(x, target_dims, &names));
    }

    match method {
        ReduceMethod::Pca => reduce_pca(x, target_dims, &names),
        ReduceMethod::Tsne => Ok(ReductionResult {
            positions: Tsne::new(TsneConfig {
                n_components: target_dims,
                ..Default::default()
            })
            .fit_transform(x),
            explained_variance: None,
            top_features: None,
        }),
        ReduceMethod::Umap => reduce_umap(x, target_dims, &names),
    }
}

#[cfg(feature = "umap")]
fn reduce_umap(x: &Array2<f64>, target_dims: usize, _names: &[String]) -> Result<ReductionResult> {
    let positions = Umap::new(UmapConfig {
        n_components: target_dims,
        ..Default::default()
    })
    .fit_transform(x);
    Ok(ReductionResult {
        positions,
        explained_variance: None,
        top_features: None,
    })
}

#[cfg(not(feature = "umap"))]
fn reduce_umap(x: &Array2<f64>, target_dims: usize, names: &[String]) -> Result<ReductionResult> {
    // Capability not compiled in: degrade to PCA rather than failing, the
    // caller still receives a valid result for the same inputs.
    tracing::warn!("UMAP support not enabled, falling back to PCA");
    reduce_pca(x, target_dims, names)
}

fn reduce_pca(x: &Array2<f64>, target_dims: usize, names: &[String]) -> Result<ReductionResult> {
    let fit = pca::fit_transform(x, target_dims);

    let top_features: Vec<Vec<String>> = fit
        .components
        .iter()
        .map(|loadings| {
            let mut order: Vec<usize> = (0..loadings.len()).collect();
            // Descending |loading|; ties keep original feature order
            order.sort_by(|&a, &b| {
                loadings[b]
                    .abs()
                    .partial_cmp(&loadings[a].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.cmp(&b))
            });
            order
                .into_iter()
                .take(TOP_FEATURES_PER_AXIS)
                .map(|i| names[i].clone())
                .collect()
        })
        .collect();

    Ok(ReductionResult {
        positions: fit.positions,
        explained_variance: Some(fit.explained_variance),
        top_features: Some(top_features),
    })
}

/// Identity / zero-pad path for inputs at or below the target width
fn passthrough(x: &Array2<f64>, target_dims: usize, names: &[String]) -> ReductionResult {
    let (n, f) = (x.nrows(), x.ncols());
    let mut positions = Array2::zeros((n, target_dims));
    for j in 0..f.min(target_dims) {
        positions.column_mut(j).assign(&x.column(j));
    }

    let top_features = (0..target_dims)
        .map(|i| {
            if names.is_empty() {
                Vec::new()
            } else {
                vec![names[i % names.len()].clone()]
            }
        })
        .collect();

    ReductionResult {
        positions,
        explained_variance: Some(vec![1.0 / target_dims as f64; target_dims]),
        top_features: Some(top_features),
    }
}
