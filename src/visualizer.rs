//! Visualization orchestrator
//!
//! Owns the dataset and the renderer, and drives the per-timestamp
//! pipeline: load and clean, prepare frames, align consecutive frames,
//! and hand the aligned pair across the renderer boundary.

use crate::align::align;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::frame::{prepare_frame, ColorSpec, Frame};
use crate::imputation::{Imputer, ImputeStrategy};
use crate::reduction::ReduceMethod;
use crate::render::Renderer;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// How missing feature values are handled at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingPolicy {
    /// Fill missing values with the given strategy
    Impute(ImputeStrategy),
    /// Drop rows with any missing feature value
    Drop,
}

impl Default for MissingPolicy {
    fn default() -> Self {
        Self::Impute(ImputeStrategy::Mean)
    }
}

/// Orchestrates the visualization workflow: data ingestion, frame
/// preparation, alignment, and renderer hand-off
pub struct Visualizer<R: Renderer> {
    renderer: R,
    dataset: Option<Dataset>,
}

impl<R: Renderer> Visualizer<R> {
    /// Create a visualizer and start the renderer's lifecycle
    pub fn new(mut renderer: R) -> Self {
        renderer.start();
        Self {
            renderer,
            dataset: None,
        }
    }

    /// The renderer, for inspection
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Load and prepare a time-series table. Rows are sorted by the time
    /// column, missing feature values are handled per `policy`, and the
    /// previous dataset (if any) is replaced wholesale.
    pub fn load_time_series(
        &mut self,
        df: &DataFrame,
        date_col: &str,
        ticker_col: &str,
        feature_cols: &[String],
        policy: MissingPolicy,
    ) -> Result<()> {
        info!(rows = df.height(), "loading time series");

        let sorted = df.sort(
            [date_col],
            SortMultipleOptions::default().with_maintain_order(true),
        )?;

        let cleaned = match policy {
            MissingPolicy::Impute(strategy) => Imputer::new(strategy)
                .with_columns(feature_cols.to_vec())
                .with_time_column(date_col)
                .fit_transform(&sorted)?,
            MissingPolicy::Drop => drop_missing_rows(&sorted, feature_cols)?,
        };

        let dataset = Dataset::from_dataframe(&cleaned, date_col, ticker_col, feature_cols)?;
        info!(
            rows = dataset.len(),
            timestamps = dataset.timestamps().len(),
            "time series loaded"
        );
        self.dataset = Some(dataset);
        Ok(())
    }

    /// Unique time keys, ascending; empty when nothing is loaded
    pub fn timestamps(&self) -> Vec<i64> {
        self.dataset
            .as_ref()
            .map(|ds| ds.timestamps())
            .unwrap_or_default()
    }

    /// Prepare the renderable frame for one timestamp. An empty frame
    /// means no rows at that timestamp (or no dataset loaded).
    pub fn prepare_frame(
        &self,
        timestamp: i64,
        method: ReduceMethod,
        color: &ColorSpec,
    ) -> Result<Frame> {
        let Some(dataset) = &self.dataset else {
            return Ok(Frame::empty());
        };
        let snapshot = dataset.snapshot(timestamp);
        prepare_frame(&snapshot, dataset.feature_names(), method, color)
    }

    /// Animate across every timestamp in `[start, end]`: for each pair of
    /// consecutive timestamps, align the two frames on their common
    /// entities and hand the pair to the renderer. Pairs with no data or
    /// no common entities are skipped. `pacing` is a presentation delay
    /// between frames, not a correctness requirement.
    pub fn run_morph_animation(
        &mut self,
        start: i64,
        end: i64,
        method: ReduceMethod,
        color: &ColorSpec,
        pacing: Duration,
    ) -> Result<()> {
        let timestamps: Vec<i64> = self
            .timestamps()
            .into_iter()
            .filter(|&t| t >= start && t <= end)
            .collect();

        info!(steps = timestamps.len(), "starting morph animation");

        for window in timestamps.windows(2) {
            let (t_curr, t_next) = (window[0], window[1]);

            let current = self.prepare_frame(t_curr, method, color)?;
            let next = self.prepare_frame(t_next, method, color)?;
            if current.is_empty() || next.is_empty() {
                continue;
            }

            let Some(pair) = align(&current, &next) else {
                warn!(t_curr, t_next, "no common entities, skipping frame pair");
                continue;
            };

            // Hand-off: the renderer takes ownership of fresh buffers and
            // may read them from its own thread past this scope
            self.renderer
                .set_points_raw(pair.current_positions, pair.current_values);
            self.renderer
                .set_target_points(pair.next_positions, pair.next_values);

            if self.renderer.supports_dimension_labels() {
                self.renderer.set_dimension_labels(
                    &current.color_label,
                    &current.x_label,
                    &current.y_label,
                    &current.z_label,
                );
            }

            info!(t_curr, t_next, points = pair.entities.len(), "morph step sent");

            if !pacing.is_zero() {
                std::thread::sleep(pacing);
            }
        }

        Ok(())
    }

    /// Stop the renderer's lifecycle; fire-and-forget
    pub fn stop(&mut self) {
        self.renderer.stop();
    }
}

/// Remove rows with a missing value in any of the given columns
fn drop_missing_rows(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let mut keep = vec![true; df.height()];
    for name in columns {
        let series = df
            .column(name)
            .map_err(|_| crate::error::MorphError::FeatureNotFound(name.to_string()))?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        for (i, opt) in series.f64()?.into_iter().enumerate() {
            if opt.is_none() {
                keep[i] = false;
            }
        }
    }
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}
