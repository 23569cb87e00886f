//! Missing-value imputation for time-series tables
//!
//! A two-phase fit/transform imputer over polars DataFrames. `Imputer`
//! holds the configuration, `fit` resolves target columns and computes
//! statistics, and the resulting immutable [`FittedImputer`] performs the
//! actual fill. Transform-before-fit is unrepresentable by construction.

use crate::error::{MorphError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::warn;

/// Imputation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Linear interpolation along row order, nearest value extended into
    /// leading/trailing gaps
    Linear,
    /// Interpolation weighted by an ordered time key; falls back to
    /// `Linear` when no usable time column is available
    Time,
    /// Forward fill
    Ffill,
    /// Backward fill
    Bfill,
    /// Fill with the column mean computed at fit time
    Mean,
    /// Fill with the column median computed at fit time
    Median,
    /// Fill with 0.0
    Zero,
}

impl FromStr for ImputeStrategy {
    type Err = MorphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "time" => Ok(Self::Time),
            "ffill" => Ok(Self::Ffill),
            "bfill" => Ok(Self::Bfill),
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "zero" => Ok(Self::Zero),
            other => Err(MorphError::InvalidInput(format!(
                "Unknown strategy '{other}'. Supported: linear, time, ffill, bfill, mean, median, zero"
            ))),
        }
    }
}

/// Imputer configuration. Produces a [`FittedImputer`] via [`Imputer::fit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    columns: Option<Vec<String>>,
    time_column: Option<String>,
}

impl Imputer {
    /// Create a new imputer with the given strategy, applied to all
    /// numeric columns unless narrowed with [`Imputer::with_columns`]
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            columns: None,
            time_column: None,
        }
    }

    /// Restrict imputation to the named columns
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Name the column carrying the ordered time key, used by the `Time`
    /// strategy for interpolation weights
    pub fn with_time_column(mut self, name: impl Into<String>) -> Self {
        self.time_column = Some(name.into());
        self
    }

    /// Fit on a DataFrame: resolve target columns and compute statistics.
    ///
    /// Fails when explicitly requested columns are absent from the frame.
    pub fn fit(&self, df: &DataFrame) -> Result<FittedImputer> {
        let columns = match &self.columns {
            Some(requested) => {
                let missing: Vec<String> = requested
                    .iter()
                    .filter(|name| df.column(name).is_err())
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    return Err(MorphError::ColumnsNotFound(missing.join(", ")));
                }
                requested.clone()
            }
            None => numeric_columns(df),
        };

        // Statistics are only meaningful for Mean/Median; other strategies
        // carry None placeholders. A wholly-null column keeps None so that
        // transform leaves it missing rather than inventing a value.
        let mut statistics: HashMap<String, Option<f64>> = HashMap::new();
        for name in &columns {
            let stat = match self.strategy {
                ImputeStrategy::Mean => column_f64(df, name)?.mean(),
                ImputeStrategy::Median => column_f64(df, name)?.median(),
                _ => None,
            };
            statistics.insert(name.clone(), stat);
        }

        Ok(FittedImputer {
            strategy: self.strategy,
            columns,
            time_column: self.time_column.clone(),
            statistics,
        })
    }

    /// Fit and transform in one step
    pub fn fit_transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?.transform(df)
    }
}

/// An imputer after fitting: resolved columns plus fit-time statistics.
/// Immutable; reapply to any frame with the same columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedImputer {
    strategy: ImputeStrategy,
    columns: Vec<String>,
    time_column: Option<String>,
    statistics: HashMap<String, Option<f64>>,
}

impl FittedImputer {
    /// Target columns resolved at fit time
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Fit-time statistic for a column (Some only for mean/median)
    pub fn statistic(&self, column: &str) -> Option<f64> {
        self.statistics.get(column).copied().flatten()
    }

    /// Fill missing values in the target columns. Non-target columns pass
    /// through untouched, values and dtype included.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let keys = self.interpolation_keys(df);

        let mut result = df.clone();
        for name in &self.columns {
            let ca = column_f64(df, name)?;
            if ca.null_count() == 0 {
                continue;
            }
            let values: Vec<Option<f64>> = ca.into_iter().collect();

            let filled = match self.strategy {
                ImputeStrategy::Linear => interpolate(&values, None),
                ImputeStrategy::Time => interpolate(&values, keys.as_deref()),
                ImputeStrategy::Ffill => fill_forward(&values),
                ImputeStrategy::Bfill => fill_backward(&values),
                ImputeStrategy::Mean | ImputeStrategy::Median => {
                    let stat = self.statistics.get(name).copied().flatten();
                    values.iter().map(|v| v.or(stat)).collect()
                }
                ImputeStrategy::Zero => values.iter().map(|v| Some(v.unwrap_or(0.0))).collect(),
            };

            result.with_column(Series::new(name.as_str().into(), filled))?;
        }

        Ok(result)
    }

    /// Time keys for the `Time` strategy. Any missing precondition is a
    /// recoverable condition: warn and return None, which degrades the
    /// interpolation to plain row-order `Linear`.
    fn interpolation_keys(&self, df: &DataFrame) -> Option<Vec<f64>> {
        if self.strategy != ImputeStrategy::Time {
            return None;
        }
        let Some(time_column) = &self.time_column else {
            warn!("strategy 'time' requires a time column; falling back to 'linear'");
            return None;
        };
        let keys = df
            .column(time_column)
            .ok()
            .and_then(|col| col.as_materialized_series().cast(&DataType::Int64).ok())
            .and_then(|s| {
                s.i64()
                    .ok()
                    .map(|ca| ca.into_iter().collect::<Vec<Option<i64>>>())
            })
            .and_then(|opts| {
                opts.into_iter()
                    .map(|v| v.map(|k| k as f64))
                    .collect::<Option<Vec<f64>>>()
            });
        if keys.is_none() {
            warn!(
                column = time_column.as_str(),
                "time column missing or not an ordered time key; falling back to 'linear'"
            );
        }
        keys
    }
}

/// Names of all numeric-typed columns, in frame order
fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| {
            matches!(
                col.dtype(),
                DataType::Int8
                    | DataType::Int16
                    | DataType::Int32
                    | DataType::Int64
                    | DataType::UInt8
                    | DataType::UInt16
                    | DataType::UInt32
                    | DataType::UInt64
                    | DataType::Float32
                    | DataType::Float64
            )
        })
        .map(|col| col.name().to_string())
        .collect()
}

/// A column as Float64, nulls preserved
fn column_f64(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let series = df
        .column(name)
        .map_err(|_| MorphError::FeatureNotFound(name.to_string()))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

/// Interpolate gaps between known values, weighted by `keys` when given
/// (row index otherwise). Leading/trailing gaps take the nearest known
/// value. With no known values the column is returned unchanged.
fn interpolate(values: &[Option<f64>], keys: Option<&[f64]>) -> Vec<Option<f64>> {
    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();
    if known.is_empty() {
        return values.to_vec();
    }

    let key_at = |i: usize| keys.map_or(i as f64, |k| k[i]);
    let mut out = values.to_vec();

    // Extend nearest known value into the leading and trailing gaps
    let (first, last) = (known[0], *known.last().unwrap());
    for slot in out.iter_mut().take(first) {
        *slot = values[first];
    }
    for slot in out.iter_mut().skip(last + 1) {
        *slot = values[last];
    }

    // Interior gaps: linear between each pair of consecutive known points
    for pair in known.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi - lo < 2 {
            continue;
        }
        let (v_lo, v_hi) = (values[lo].unwrap(), values[hi].unwrap());
        let span = key_at(hi) - key_at(lo);
        for i in lo + 1..hi {
            let t = if span != 0.0 {
                (key_at(i) - key_at(lo)) / span
            } else {
                0.0
            };
            out[i] = Some(v_lo + t * (v_hi - v_lo));
        }
    }

    out
}

fn fill_forward(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut carry = None;
    values
        .iter()
        .map(|v| {
            if v.is_some() {
                carry = *v;
            }
            v.or(carry)
        })
        .collect()
}

fn fill_backward(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = fill_forward(&values.iter().rev().copied().collect::<Vec<_>>());
    out.reverse();
    out
}
