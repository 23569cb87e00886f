//! Position normalization into a bounded cube

use ndarray::Array2;

/// Center a point cloud at the origin and rescale it uniformly so its
/// maximum absolute coordinate equals `scale`. Aspect ratio is preserved
/// (one shared divisor, not per-axis). An all-identical cloud stays at the
/// origin; the division is skipped entirely.
pub fn normalize_positions(positions: &Array2<f64>, scale: f64) -> Array2<f64> {
    let (n, dims) = (positions.nrows(), positions.ncols());
    if n == 0 {
        return positions.clone();
    }

    let mut centered = positions.clone();
    for j in 0..dims {
        let mean = positions.column(j).sum() / n as f64;
        centered.column_mut(j).mapv_inplace(|v| v - mean);
    }

    let max_abs = centered.iter().fold(0.0f64, |m, &v| m.max(v.abs()));
    if max_abs > 0.0 {
        centered.mapv_inplace(|v| v / max_abs);
    }

    centered * scale
}
