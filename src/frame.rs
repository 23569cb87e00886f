//! Per-timestamp frame preparation
//!
//! Turns one Snapshot into a renderable Frame: color-feature selection and
//! [0,1] scaling, reduction of the remaining features to three axes,
//! normalization into the scene cube, and axis-label synthesis.

use crate::dataset::Snapshot;
use crate::error::Result;
use crate::normalize::normalize_positions;
use crate::reduction::{reduce, ReduceMethod, ReductionResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Half-extent of the cube the normalized point cloud is fitted into
pub const SCENE_SCALE: f64 = 10.0;

/// Feature labels longer than this are truncated with an ellipsis
const LABEL_MAX_CHARS: usize = 20;

/// How the color channel is chosen for a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpec {
    /// Pick the feature with the highest variance across the snapshot
    Auto,
    /// A feature by name; an unknown name falls back to the first feature
    Name(String),
    /// A feature by index, taken modulo the feature count
    Index(i64),
}

/// A fully prepared, renderer-ready snapshot
#[derive(Debug, Clone)]
pub struct Frame {
    /// Normalized positions, N x 3
    pub positions: Array2<f32>,
    /// Color values in [0, 1], one per entity
    pub values: Vec<f32>,
    /// Entity ids, row-aligned with positions/values
    pub entities: Vec<String>,
    pub color_label: String,
    pub x_label: String,
    pub y_label: String,
    pub z_label: String,
}

impl Frame {
    /// The "no data at this timestamp" frame; a normal outcome, not an error
    pub fn empty() -> Self {
        Self {
            positions: Array2::zeros((0, 3)),
            values: Vec::new(),
            entities: Vec::new(),
            color_label: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            z_label: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }
}

/// Prepare a renderable frame from one snapshot.
///
/// The color feature is resolved first and excluded from the matrix handed
/// to the reducer; the embedding and the color channel never overlap.
pub fn prepare_frame(
    snapshot: &Snapshot,
    feature_names: &[String],
    method: ReduceMethod,
    color: &ColorSpec,
) -> Result<Frame> {
    if snapshot.is_empty() || feature_names.is_empty() {
        return Ok(Frame::empty());
    }

    let x = &snapshot.features;
    let (color_idx, color_label) = resolve_color(x, feature_names, color);
    let values = scale_unit(&x.column(color_idx).to_vec());

    // Drop the color column from both the matrix and the name list
    let keep: Vec<usize> = (0..x.ncols()).filter(|&j| j != color_idx).collect();
    let mut reduced_input = Array2::zeros((x.nrows(), keep.len()));
    for (dst, &src) in keep.iter().enumerate() {
        reduced_input.column_mut(dst).assign(&x.column(src));
    }
    let reduced_names: Vec<String> = keep.iter().map(|&j| feature_names[j].clone()).collect();

    let result = reduce(&reduced_input, method, 3, Some(&reduced_names))?;
    let positions = normalize_positions(&result.positions, SCENE_SCALE);

    let [x_label, y_label, z_label] = axis_labels(method, &result);

    Ok(Frame {
        positions: positions.mapv(|v| v as f32),
        values,
        entities: snapshot.entities.clone(),
        color_label,
        x_label,
        y_label,
        z_label,
    })
}

/// Resolve the color feature to a column index plus a display label.
/// Unknown names and out-of-range indices are permissive fallbacks kept
/// for compatibility; both are logged so misuse stays visible.
fn resolve_color(x: &Array2<f64>, names: &[String], color: &ColorSpec) -> (usize, String) {
    let n_features = names.len();
    match color {
        ColorSpec::Auto => {
            let idx = (0..n_features)
                .max_by(|&a, &b| {
                    column_variance(x, a)
                        .partial_cmp(&column_variance(x, b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(0);
            (idx, format!("{} (auto)", names[idx]))
        }
        ColorSpec::Name(name) => match names.iter().position(|n| n == name) {
            Some(idx) => (idx, name.clone()),
            None => {
                warn!(feature = name.as_str(), "color feature not found, using first feature");
                (0, format!("{} (fallback)", names[0]))
            }
        },
        ColorSpec::Index(i) => {
            let idx = i.rem_euclid(n_features as i64) as usize;
            if *i < 0 || *i >= n_features as i64 {
                warn!(index = i, resolved = idx, "color index out of range, wrapped");
            }
            (idx, names[idx].clone())
        }
    }
}

fn column_variance(x: &Array2<f64>, j: usize) -> f64 {
    let n = x.nrows() as f64;
    let mean = x.column(j).sum() / n;
    x.column(j).iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Min-max scale to [0, 1]. A constant column yields zeros, never NaN.
fn scale_unit(values: &[f64]) -> Vec<f32> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > min {
        values
            .iter()
            .map(|&v| {
                let scaled = (v - min) / (max - min);
                if scaled.is_finite() {
                    scaled as f32
                } else {
                    0.0
                }
            })
            .collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// Human-readable axis labels, 1-indexed per axis
fn axis_labels(method: ReduceMethod, result: &ReductionResult) -> [String; 3] {
    let mut labels: Vec<String> = Vec::with_capacity(3);
    for i in 0..3 {
        let label = match (method, &result.explained_variance, &result.top_features) {
            (ReduceMethod::Pca, Some(variance), Some(top)) => {
                let var_pct = (variance.get(i).copied().unwrap_or(0.0) * 100.0) as i64;
                let feat_str = truncate_label(
                    &top.get(i)
                        .map(|names| names.iter().take(2).cloned().collect::<Vec<_>>().join(", "))
                        .unwrap_or_default(),
                );
                format!("PC{} ({var_pct}%) -> {feat_str}", i + 1)
            }
            (ReduceMethod::Tsne, _, _) => format!("t-SNE {}", i + 1),
            (ReduceMethod::Umap, _, _) => format!("UMAP {}", i + 1),
            _ => format!("Axis {}", i + 1),
        };
        labels.push(label);
    }
    [labels.remove(0), labels.remove(0), labels.remove(0)]
}

fn truncate_label(s: &str) -> String {
    if s.chars().count() > LABEL_MAX_CHARS {
        let head: String = s.chars().take(LABEL_MAX_CHARS - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn snapshot() -> Snapshot {
        Snapshot {
            entities: vec!["AAPL".into(), "MSFT".into(), "GOOG".into(), "AMZN".into()],
            features: array![
                [1.0, 100.0, 5.0, 0.1],
                [2.0, 250.0, 6.0, 0.2],
                [3.0, 400.0, 7.0, 0.3],
                [4.0, 900.0, 8.0, 0.4],
            ],
        }
    }

    fn names() -> Vec<String> {
        vec!["F1".into(), "F2".into(), "F3".into(), "F4".into()]
    }

    #[test]
    fn test_auto_color_picks_highest_variance() {
        let (idx, label) = resolve_color(&snapshot().features, &names(), &ColorSpec::Auto);
        assert_eq!(idx, 1);
        assert_eq!(label, "F2 (auto)");
    }

    #[test]
    fn test_color_name_fallback() {
        let (idx, label) =
            resolve_color(&snapshot().features, &names(), &ColorSpec::Name("Nope".into()));
        assert_eq!(idx, 0);
        assert_eq!(label, "F1 (fallback)");
    }

    #[test]
    fn test_color_index_wraps() {
        let (idx, label) = resolve_color(&snapshot().features, &names(), &ColorSpec::Index(6));
        assert_eq!(idx, 2);
        assert_eq!(label, "F3");

        let (idx, _) = resolve_color(&snapshot().features, &names(), &ColorSpec::Index(-1));
        assert_eq!(idx, 3);
    }

    #[test]
    fn test_scale_unit_range() {
        let values = scale_unit(&[10.0, 20.0, 15.0]);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 1.0);
        assert!(values.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_scale_unit_constant_is_zeros() {
        let values = scale_unit(&[7.0, 7.0, 7.0]);
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_prepare_frame_shapes() {
        let frame =
            prepare_frame(&snapshot(), &names(), ReduceMethod::Pca, &ColorSpec::Auto).unwrap();
        assert_eq!(frame.positions.shape(), &[4, 3]);
        assert_eq!(frame.values.len(), 4);
        assert_eq!(frame.entities.len(), 4);
        assert!(frame.values.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_color_feature_excluded_from_embedding() {
        let frame =
            prepare_frame(&snapshot(), &names(), ReduceMethod::Pca, &ColorSpec::Auto).unwrap();

        // F2 is the color channel; the three remaining columns fit the axes
        // exactly, so the embedding is their normalized identity passthrough
        // with no zero-padded axis
        let rest = array![
            [1.0, 5.0, 0.1],
            [2.0, 6.0, 0.2],
            [3.0, 7.0, 0.3],
            [4.0, 8.0, 0.4],
        ];
        let expected = normalize_positions(&rest, SCENE_SCALE);
        for i in 0..4 {
            for j in 0..3 {
                assert!(
                    (frame.positions[[i, j]] as f64 - expected[[i, j]]).abs() < 1e-5,
                    "position [{i},{j}] should come from the non-color columns"
                );
            }
        }
        // Per-feature axis labels confirm no reduction ran over F2
        assert!(frame.x_label.ends_with("F1"));
        assert!(frame.y_label.ends_with("F3"));
        assert!(frame.z_label.ends_with("F4"));
    }

    #[test]
    fn test_prepare_frame_empty_snapshot() {
        let empty = Snapshot {
            entities: Vec::new(),
            features: Array2::zeros((0, 3)),
        };
        let frame = prepare_frame(&empty, &names()[..3], ReduceMethod::Pca, &ColorSpec::Auto)
            .unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_pca_labels_have_variance_and_features() {
        let frame =
            prepare_frame(&snapshot(), &names(), ReduceMethod::Pca, &ColorSpec::Auto).unwrap();
        assert!(frame.x_label.starts_with("PC1 ("));
        assert!(frame.x_label.contains("%) -> "));
        assert!(frame.z_label.starts_with("PC3"));
    }

    #[test]
    fn test_tsne_labels_are_ordinal() {
        let frame =
            prepare_frame(&snapshot(), &names(), ReduceMethod::Tsne, &ColorSpec::Auto).unwrap();
        assert_eq!(frame.x_label, "t-SNE 1");
        assert_eq!(frame.y_label, "t-SNE 2");
        assert_eq!(frame.z_label, "t-SNE 3");
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short"), "short");
        let long = "abcdefghijklmnopqrstuvwxyz";
        let out = truncate_label(long);
        assert_eq!(out.chars().count(), 20);
        assert!(out.ends_with("..."));
    }
}
