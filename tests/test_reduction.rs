//! Integration test: dimensionality reduction and normalization

use morphview::normalize::normalize_positions;
use morphview::reduction::{reduce, ReduceMethod};
use ndarray::{array, Array2};
use std::str::FromStr;

fn wide_matrix() -> Array2<f64> {
    // 8 rows x 5 features, one dominant direction plus noise-like columns
    array![
        [1.0, 2.0, 0.1, 5.0, 1.0],
        [2.0, 4.0, 0.2, 5.1, 0.9],
        [3.0, 6.0, 0.1, 4.9, 1.1],
        [4.0, 8.0, 0.3, 5.0, 1.0],
        [5.0, 10.0, 0.2, 5.2, 0.8],
        [6.0, 12.0, 0.1, 4.8, 1.2],
        [7.0, 14.0, 0.3, 5.1, 0.9],
        [8.0, 16.0, 0.2, 5.0, 1.0],
    ]
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("F{i}")).collect()
}

#[test]
fn test_pca_shapes_and_variance() {
    let x = wide_matrix();
    let result = reduce(&x, ReduceMethod::Pca, 3, Some(&names(5))).unwrap();

    assert_eq!(result.positions.shape(), &[8, 3]);
    let variance = result.explained_variance.unwrap();
    assert_eq!(variance.len(), 3);
    let total: f64 = variance.iter().sum();
    assert!(total <= 1.0 + 1e-9);
    // Axes come out in descending variance order
    assert!(variance[0] >= variance[1] && variance[1] >= variance[2]);
    // The correlated F0/F1 direction dominates
    assert!(variance[0] > 0.9);

    let top = result.top_features.unwrap();
    assert_eq!(top.len(), 3);
    assert!(top.iter().all(|axis| !axis.is_empty() && axis.len() <= 3));
}

#[test]
fn test_pca_top_features_track_loadings() {
    let x = wide_matrix();
    let result = reduce(&x, ReduceMethod::Pca, 3, Some(&names(5))).unwrap();
    let top = result.top_features.unwrap();
    // F0 and F1 carry the first axis
    assert!(top[0].contains(&"F0".to_string()));
    assert!(top[0].contains(&"F1".to_string()));
}

#[test]
fn test_passthrough_identity_at_three_features() {
    let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
    let result = reduce(&x, ReduceMethod::Pca, 3, Some(&names(3))).unwrap();

    assert_eq!(result.positions, x);
    let variance = result.explained_variance.unwrap();
    assert!(variance.iter().all(|&v| (v - 1.0 / 3.0).abs() < 1e-12));
    let top = result.top_features.unwrap();
    assert_eq!(top[0], vec!["F0".to_string()]);
    assert_eq!(top[2], vec!["F2".to_string()]);
}

#[test]
fn test_passthrough_zero_pads_narrow_input() {
    let x = array![[1.0, 2.0], [3.0, 4.0]];
    let result = reduce(&x, ReduceMethod::Tsne, 3, Some(&names(2))).unwrap();

    assert_eq!(result.positions.shape(), &[2, 3]);
    assert_eq!(result.positions[[0, 0]], 1.0);
    assert!(result.positions.column(2).iter().all(|&v| v == 0.0));
    // Contributors wrap around the short name list
    let top = result.top_features.unwrap();
    assert_eq!(top[2], vec!["F0".to_string()]);
}

#[test]
fn test_tsne_produces_finite_embedding() {
    let x = wide_matrix();
    let result = reduce(&x, ReduceMethod::Tsne, 3, Some(&names(5))).unwrap();

    assert_eq!(result.positions.shape(), &[8, 3]);
    assert!(result.positions.iter().all(|v| v.is_finite()));
    assert!(result.explained_variance.is_none());
    assert!(result.top_features.is_none());
}

#[test]
fn test_umap_produces_finite_embedding() {
    let x = wide_matrix();
    let result = reduce(&x, ReduceMethod::Umap, 3, Some(&names(5))).unwrap();

    assert_eq!(result.positions.shape(), &[8, 3]);
    assert!(result.positions.iter().all(|v| v.is_finite()));
}

#[test]
fn test_method_parsing() {
    assert_eq!(ReduceMethod::from_str("pca").unwrap(), ReduceMethod::Pca);
    assert_eq!(ReduceMethod::from_str("tsne").unwrap(), ReduceMethod::Tsne);
    assert_eq!(ReduceMethod::from_str("umap").unwrap(), ReduceMethod::Umap);
    assert!(ReduceMethod::from_str("isomap").is_err());
}

#[test]
fn test_mismatched_feature_names_rejected() {
    let x = wide_matrix();
    assert!(reduce(&x, ReduceMethod::Pca, 3, Some(&names(4))).is_err());
}

#[test]
fn test_normalize_bounds_the_cloud() {
    let x = wide_matrix();
    let result = reduce(&x, ReduceMethod::Pca, 3, Some(&names(5))).unwrap();
    let normalized = normalize_positions(&result.positions, 10.0);

    let max_abs = normalized.iter().fold(0.0f64, |m, &v| m.max(v.abs()));
    assert!((max_abs - 10.0).abs() < 1e-9);
    for j in 0..3 {
        let mean = normalized.column(j).sum() / normalized.nrows() as f64;
        assert!(mean.abs() < 1e-9);
    }
}
