//! Morphview - time-series to 3D point-cloud preparation pipeline
//!
//! Prepares high-dimensional time-series tables for animated 3D point-cloud
//! rendering: each timestamp's rows become a cloud of points, consecutive
//! clouds are aligned on their common entities, and the pairs are handed to
//! a pluggable rendering backend that interpolates between them.
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`imputation`] - Missing value imputation (interpolation, fills, statistics)
//! - [`dataset`] - Time-indexed dataset extraction from DataFrames
//! - [`reduction`] - Dimensionality reduction (PCA, t-SNE, UMAP)
//! - [`normalize`] - Scene-cube position normalization
//! - [`frame`] - Per-timestamp frame preparation (color, labels)
//! - [`align`] - Cross-frame entity alignment
//!
//! ## Orchestration
//! - [`visualizer`] - End-to-end workflow driver
//! - [`render`] - Renderer boundary trait and headless test double

// Core error handling
pub mod error;

// Pipeline stages
pub mod imputation;
pub mod dataset;
pub mod reduction;
pub mod normalize;
pub mod frame;
pub mod align;

// Orchestration
pub mod render;
pub mod visualizer;

pub use error::{MorphError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{MorphError, Result};

    // Imputation
    pub use crate::imputation::{FittedImputer, Imputer, ImputeStrategy};

    // Dataset
    pub use crate::dataset::{Dataset, Snapshot};

    // Reduction
    pub use crate::reduction::{reduce, ReduceMethod, ReductionResult};

    // Frame preparation
    pub use crate::frame::{prepare_frame, ColorSpec, Frame, SCENE_SCALE};

    // Alignment
    pub use crate::align::{align, AlignedPair};

    // Rendering and orchestration
    pub use crate::render::{HeadlessRenderer, Renderer};
    pub use crate::visualizer::{MissingPolicy, Visualizer};
}
