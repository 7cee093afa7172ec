//! Height-query backends: "highest safe Z at (x, y)".
//!
//! Two interchangeable implementations exist behind the [`Sampler`]
//! trait: a bilinearly interpolated raster height field and an exact
//! drop-cutter query against a caller-supplied collision world. Both are
//! read-only for the duration of one operation, so they can be shared
//! freely across sampling work.

use crate::geom::Point;

/// Read-only query object returning the maximum safe Z at an XY (or
/// swept multi-axis) location. `None` is the "no material / outside
/// covered area" sentinel and is never fatal.
pub trait Sampler: Send + Sync {
    /// Highest Z at which the cutter touches the material at `(x, y)`
    /// without penetrating, or `None` outside the covered area.
    fn height_at(&self, x: f64, y: f64) -> Option<f64>;

    /// Swept variant for multi-axis samples: the maximum height along the
    /// `start -> end` sweep. The default delegates to the sweep end.
    fn swept_height_at(&self, _start: &Point, end: &Point) -> Option<f64> {
        self.height_at(end.x, end.y)
    }
}

/// Raster height field covering the operation bounding box plus a border
/// margin, bilinearly interpolated between grid cells.
#[derive(Debug, Clone)]
pub struct RasterSampler {
    origin: (f64, f64),
    pitch: f64,
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl RasterSampler {
    /// Wraps an existing row-major grid. The grid length must equal
    /// `width * height` and the pitch must be positive.
    pub fn new(origin: (f64, f64), pitch: f64, width: usize, height: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), width * height, "grid size mismatch");
        assert!(pitch > 0.0, "pitch must be positive");
        Self {
            origin,
            pitch,
            width,
            height,
            data,
        }
    }

    /// Builds a grid by evaluating `f` at every cell center.
    pub fn from_fn(
        origin: (f64, f64),
        pitch: f64,
        width: usize,
        height: usize,
        f: impl Fn(f64, f64) -> f64,
    ) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for iy in 0..height {
            for ix in 0..width {
                let x = origin.0 + ix as f64 * pitch;
                let y = origin.1 + iy as f64 * pitch;
                data.push(f(x, y));
            }
        }
        Self::new(origin, pitch, width, height, data)
    }

    /// Builds a flat surface at the given Z.
    pub fn flat(origin: (f64, f64), pitch: f64, width: usize, height: usize, z: f64) -> Self {
        Self::new(origin, pitch, width, height, vec![z; width * height])
    }

    /// Grid pitch.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    fn cell(&self, ix: usize, iy: usize) -> f64 {
        self.data[iy * self.width + ix]
    }
}

impl Sampler for RasterSampler {
    fn height_at(&self, x: f64, y: f64) -> Option<f64> {
        let gx = (x - self.origin.0) / self.pitch;
        let gy = (y - self.origin.1) / self.pitch;
        if gx < 0.0 || gy < 0.0 || gx > (self.width - 1) as f64 || gy > (self.height - 1) as f64 {
            return None;
        }
        let ix = (gx.floor() as usize).min(self.width.saturating_sub(2));
        let iy = (gy.floor() as usize).min(self.height.saturating_sub(2));
        if self.width < 2 || self.height < 2 {
            return Some(self.cell(0, 0));
        }
        let tx = gx - ix as f64;
        let ty = gy - iy as f64;
        let h00 = self.cell(ix, iy);
        let h10 = self.cell(ix + 1, iy);
        let h01 = self.cell(ix, iy + 1);
        let h11 = self.cell(ix + 1, iy + 1);
        let bottom = h00 + (h10 - h00) * tx;
        let top = h01 + (h11 - h01) * tx;
        Some(bottom + (top - bottom) * ty)
    }
}

/// Drop-cutter collision test supplied by the caller: the maximum Z at
/// which the actual cutter shape touches the solid without penetrating.
///
/// Implementations must be monotonic (never report a Z below the material
/// surface under the cutter footprint) and side-effect-free as observed
/// by the engine.
pub trait CollisionQuery: Send + Sync {
    /// Single-point drop-cutter test.
    fn drop_cutter(&self, x: f64, y: f64) -> Option<f64>;

    /// Swept drop-cutter test along a segment; the default samples the
    /// segment end.
    fn drop_cutter_swept(&self, _start: &Point, end: &Point) -> Option<f64> {
        self.drop_cutter(end.x, end.y)
    }
}

/// Exact sampler: delegates every height query to a drop-cutter
/// collision test against a solid/mesh model.
pub struct ExactSampler<Q: CollisionQuery> {
    query: Q,
}

impl<Q: CollisionQuery> ExactSampler<Q> {
    /// Wraps a collision world. Constructing the world itself (mesh
    /// loading, cutter shape) is the caller's responsibility.
    pub fn new(query: Q) -> Self {
        Self { query }
    }
}

impl<Q: CollisionQuery> Sampler for ExactSampler<Q> {
    fn height_at(&self, x: f64, y: f64) -> Option<f64> {
        self.query.drop_cutter(x, y)
    }

    fn swept_height_at(&self, start: &Point, end: &Point) -> Option<f64> {
        self.query.drop_cutter_swept(start, end)
    }
}
