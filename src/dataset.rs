//! Time-series dataset: ordered rows of (time key, entity id, features)
//!
//! Built once from a caller-supplied polars DataFrame with designated
//! time, entity, and feature columns; owned by the pipeline for the
//! session and replaced wholesale on reload. Snapshots are derived
//! transiently and never mutate the dataset.

use crate::error::{MorphError, Result};
use ndarray::Array2;
use polars::prelude::*;

/// All entities' feature vectors at one exact timestamp
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Entity ids, one per row
    pub entities: Vec<String>,
    /// Feature matrix, N rows x F features
    pub features: Array2<f64>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }
}

/// An immutable, time-ordered view of a multi-entity feature table
#[derive(Debug, Clone)]
pub struct Dataset {
    time_keys: Vec<i64>,
    entities: Vec<String>,
    features: Array2<f64>,
    feature_names: Vec<String>,
}

impl Dataset {
    /// Build a dataset from a DataFrame. Rows are sorted by the time
    /// column ascending (stable); the time column must cast to an ordered
    /// integer key and may not contain nulls. Missing feature values
    /// become NaN in the matrix.
    pub fn from_dataframe(
        df: &DataFrame,
        time_col: &str,
        entity_col: &str,
        feature_cols: &[String],
    ) -> Result<Self> {
        let n_rows = df.height();

        let time_keys = extract_time_keys(df, time_col)?;
        let entities = extract_entities(df, entity_col)?;

        let mut flat = Vec::with_capacity(n_rows * feature_cols.len());
        for name in feature_cols {
            let series = df
                .column(name)
                .map_err(|_| MorphError::FeatureNotFound(name.to_string()))?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            for opt in series.f64()?.into_iter() {
                flat.push(opt.unwrap_or(f64::NAN));
            }
        }
        // flat is column-major; transpose into row-major N x F
        let columns = Array2::from_shape_vec((feature_cols.len(), n_rows), flat)?;
        let features = columns.t().to_owned();

        // Stable argsort by time key, then reorder every row-aligned part
        let mut order: Vec<usize> = (0..n_rows).collect();
        order.sort_by_key(|&i| time_keys[i]);

        let time_keys: Vec<i64> = order.iter().map(|&i| time_keys[i]).collect();
        let entities: Vec<String> = order.iter().map(|&i| entities[i].clone()).collect();
        let mut sorted = Array2::zeros((n_rows, feature_cols.len()));
        for (dst, &src) in order.iter().enumerate() {
            sorted.row_mut(dst).assign(&features.row(src));
        }

        Ok(Self {
            time_keys,
            entities,
            features: sorted,
            feature_names: feature_cols.to_vec(),
        })
    }

    /// Number of rows across all timestamps
    pub fn len(&self) -> usize {
        self.time_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_keys.is_empty()
    }

    /// Feature column names, in matrix column order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Unique time keys, ascending
    pub fn timestamps(&self) -> Vec<i64> {
        let mut out: Vec<i64> = Vec::new();
        for &t in &self.time_keys {
            if out.last() != Some(&t) {
                out.push(t);
            }
        }
        out
    }

    /// The subset of rows at exactly `timestamp`. An empty snapshot is a
    /// normal outcome the caller must check for, not an error.
    pub fn snapshot(&self, timestamp: i64) -> Snapshot {
        let rows: Vec<usize> = self
            .time_keys
            .iter()
            .enumerate()
            .filter_map(|(i, &t)| (t == timestamp).then_some(i))
            .collect();

        let mut features = Array2::zeros((rows.len(), self.feature_names.len()));
        for (dst, &src) in rows.iter().enumerate() {
            features.row_mut(dst).assign(&self.features.row(src));
        }

        Snapshot {
            entities: rows.iter().map(|&i| self.entities[i].clone()).collect(),
            features,
        }
    }
}

fn extract_time_keys(df: &DataFrame, time_col: &str) -> Result<Vec<i64>> {
    let series = df
        .column(time_col)
        .map_err(|_| MorphError::FeatureNotFound(time_col.to_string()))?
        .as_materialized_series()
        .cast(&DataType::Int64)
        .map_err(|_| {
            MorphError::DataError(format!(
                "time column '{time_col}' is not coercible to an ordered time key"
            ))
        })?;

    series
        .i64()?
        .into_iter()
        .map(|opt| {
            opt.ok_or_else(|| {
                MorphError::DataError(format!("time column '{time_col}' contains nulls"))
            })
        })
        .collect()
}

fn extract_entities(df: &DataFrame, entity_col: &str) -> Result<Vec<String>> {
    let series = df
        .column(entity_col)
        .map_err(|_| MorphError::FeatureNotFound(entity_col.to_string()))?
        .as_materialized_series()
        .cast(&DataType::String)?;

    Ok(series
        .str()?
        .into_iter()
        .map(|opt| opt.unwrap_or("").to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df!(
            "Date" => &[2i64, 1, 2, 1],
            "Ticker" => &["MSFT", "AAPL", "AAPL", "MSFT"],
            "F1" => &[3.0, 1.0, 4.0, 2.0],
            "F2" => &[30.0, 10.0, 40.0, 20.0],
        )
        .unwrap()
    }

    #[test]
    fn test_rows_sorted_by_time() {
        let ds = Dataset::from_dataframe(
            &sample_df(),
            "Date",
            "Ticker",
            &["F1".to_string(), "F2".to_string()],
        )
        .unwrap();

        assert_eq!(ds.timestamps(), vec![1, 2]);
        let snap = ds.snapshot(1);
        assert_eq!(snap.len(), 2);
        // Stable sort preserves original order within a timestamp
        assert_eq!(snap.entities, vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(snap.features[[0, 0]], 1.0);
        assert_eq!(snap.features[[1, 1]], 20.0);
    }

    #[test]
    fn test_snapshot_missing_timestamp_is_empty() {
        let ds = Dataset::from_dataframe(&sample_df(), "Date", "Ticker", &["F1".to_string()])
            .unwrap();
        assert!(ds.snapshot(99).is_empty());
    }

    #[test]
    fn test_null_feature_becomes_nan() {
        let df = df!(
            "Date" => &[1i64, 1],
            "Ticker" => &["A", "B"],
            "F1" => &[Some(1.0), None],
        )
        .unwrap();
        let ds = Dataset::from_dataframe(&df, "Date", "Ticker", &["F1".to_string()]).unwrap();
        assert!(ds.snapshot(1).features[[1, 0]].is_nan());
    }

    #[test]
    fn test_bad_time_column_is_fatal() {
        let df = df!(
            "Date" => &["notatime", "also not"],
            "Ticker" => &["A", "B"],
            "F1" => &[1.0, 2.0],
        )
        .unwrap();
        let err =
            Dataset::from_dataframe(&df, "Date", "Ticker", &["F1".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Date"));
    }
}
