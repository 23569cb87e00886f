//! Renderer boundary
//!
//! The pipeline treats the rendering engine as an opaque capability with
//! exactly five operations. Point uploads take owned buffers: the renderer
//! may retain them and read them from its own thread, so every array
//! crossing this boundary is a fresh copy the pipeline never touches
//! again (copy-on-handoff, no shared mutable state, no locks).

/// The external rendering engine contract
pub trait Renderer: Send {
    /// Begin the renderer's own execution lifecycle; no-op if already started
    fn start(&mut self);

    /// End the lifecycle; idempotent, fire-and-forget
    fn stop(&mut self);

    /// Establish the current point cloud
    fn set_points_raw(&mut self, positions: Vec<[f32; 3]>, values: Vec<f32>);

    /// Establish the interpolation target for animation
    fn set_target_points(&mut self, positions: Vec<[f32; 3]>, values: Vec<f32>);

    /// Whether the renderer can display dimension labels. The pipeline
    /// probes this before calling `set_dimension_labels`.
    fn supports_dimension_labels(&self) -> bool {
        false
    }

    /// Optional capability: describe the color channel and the three axes
    fn set_dimension_labels(&mut self, _color: &str, _x: &str, _y: &str, _z: &str) {}
}

/// A recording test double standing in for a real rendering backend
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    pub started: bool,
    pub start_calls: usize,
    pub stop_calls: usize,
    /// Every (positions, values) pair handed to `set_points_raw`
    pub point_uploads: Vec<(Vec<[f32; 3]>, Vec<f32>)>,
    /// Every (positions, values) pair handed to `set_target_points`
    pub target_uploads: Vec<(Vec<[f32; 3]>, Vec<f32>)>,
    /// Every (color, x, y, z) label set received
    pub labels: Vec<[String; 4]>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for HeadlessRenderer {
    fn start(&mut self) {
        if !self.started {
            self.started = true;
        }
        self.start_calls += 1;
    }

    fn stop(&mut self) {
        self.started = false;
        self.stop_calls += 1;
    }

    fn set_points_raw(&mut self, positions: Vec<[f32; 3]>, values: Vec<f32>) {
        self.point_uploads.push((positions, values));
    }

    fn set_target_points(&mut self, positions: Vec<[f32; 3]>, values: Vec<f32>) {
        self.target_uploads.push((positions, values));
    }

    fn supports_dimension_labels(&self) -> bool {
        true
    }

    fn set_dimension_labels(&mut self, color: &str, x: &str, y: &str, z: &str) {
        self.labels
            .push([color.to_string(), x.to_string(), y.to_string(), z.to_string()]);
    }
}
