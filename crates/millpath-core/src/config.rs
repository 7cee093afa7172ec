//! Operation configuration and depth layers.
//!
//! One [`OperationConfig`] describes everything a machining strategy
//! hands to the chunk engine: the working volume, depth range and
//! step-down, spacing, movement policy, and the entry/optimization
//! post-processing knobs. Angles are stored in radians.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::movement::MovementPolicy;

/// Axis-aligned working volume of the operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner (x, y, z) in machine coordinates.
    pub min: (f64, f64, f64),
    /// Maximum corner (x, y, z) in machine coordinates.
    pub max: (f64, f64, f64),
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: (0.0, 0.0, -10.0),
            max: (100.0, 100.0, 0.0),
        }
    }
}

/// A `[top, bottom]` depth interval one pass of the operation is
/// confined to (`top > bottom`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub top: f64,
    pub bottom: f64,
}

impl Layer {
    /// Splits a depth range into ordered step-down layers, top first.
    ///
    /// With layering disabled (or a non-positive step-down) a single
    /// layer spans the whole depth. Fails with
    /// [`EngineError::DepthOrder`] when the start depth lies below the
    /// end depth; this is a configuration error surfaced to the caller
    /// before any sampling work begins.
    pub fn slice(
        start_depth: f64,
        end_depth: f64,
        step_down: f64,
        use_layers: bool,
    ) -> Result<Vec<Layer>> {
        if start_depth < end_depth {
            return Err(EngineError::DepthOrder {
                start_depth,
                end_depth,
            });
        }
        if !use_layers || step_down <= 0.0 {
            return Ok(vec![Layer {
                top: start_depth,
                bottom: end_depth,
            }]);
        }
        let mut layers = Vec::new();
        let mut top = start_depth;
        while top - end_depth > 1e-9 {
            let bottom = (top - step_down).max(end_depth);
            layers.push(Layer { top, bottom });
            top = bottom;
        }
        if layers.is_empty() {
            layers.push(Layer {
                top: start_depth,
                bottom: end_depth,
            });
        }
        Ok(layers)
    }

    /// Layer thickness.
    pub fn thickness(&self) -> f64 {
        self.top - self.bottom
    }
}

/// Ramp entry style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RampStyle {
    /// Back-and-forth traverse folded over the chunk's own geometry.
    ZigZag,
    /// Descend along the closed chunk's own loop.
    Contour,
    /// Helical descent circle at the chunk entry.
    Helix,
}

/// Ramp entry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampConfig {
    pub enabled: bool,
    pub style: RampStyle,
    /// Descent angle from horizontal, radians.
    pub angle_in: f64,
    /// Append a symmetric climb back out at the chunk tail.
    pub ramp_out: bool,
    /// Climb angle for the ramp-out, radians.
    pub angle_out: f64,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            style: RampStyle::ZigZag,
            angle_in: 30f64.to_radians(),
            ramp_out: false,
            angle_out: 30f64.to_radians(),
        }
    }
}

/// Lead-in/out arc configuration for closed contours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeadConfig {
    pub enabled: bool,
    /// Arc radius of the tangential entry/exit.
    pub radius: f64,
}

impl Default for LeadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 1.0,
        }
    }
}

/// Point-decimation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizeConfig {
    pub enabled: bool,
    /// Points closer than this to the kept line are dropped.
    pub threshold: f64,
    /// Snap near-vertical wall segments back to plumb.
    pub protect_vertical: bool,
    /// Maximum lean from vertical that still counts as a wall, radians.
    pub protect_vertical_limit: f64,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.002,
            protect_vertical: true,
            protect_vertical_limit: 3f64.to_radians(),
        }
    }
}

/// How cut-order edges are derived between sampled chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HierarchyPolicy {
    /// No linking; chunks are only ordered by travel distance.
    None,
    /// Link chunks whose XY distance is under the spacing cutoff.
    Distance,
    /// Link nested contours by polygon containment.
    Containment,
}

/// Everything the engine needs to turn candidate chunks into an ordered
/// toolpath.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationConfig {
    pub bounds: Bounds,
    /// Top of the cut (machine Z, usually 0 at stock top).
    pub start_depth: f64,
    /// Bottom of the cut (machine Z, below `start_depth`).
    pub end_depth: f64,
    /// Depth removed per layer when layering is on.
    pub step_down: f64,
    /// Cut the depth range in layers, each finished before the next.
    pub use_layers: bool,
    /// Distance between neighbouring passes of the pattern.
    pub path_spacing: f64,
    /// Sampling distance along the path; also the bridge subdivision step.
    pub along_path_step: f64,
    pub movement: MovementPolicy,
    pub cutter_diameter: f64,
    pub ramp: RampConfig,
    pub lead: LeadConfig,
    pub optimize: OptimizeConfig,
    pub hierarchy: HierarchyPolicy,
    /// Merge chunks whose gap is below this; `None` disables splicing.
    /// Finishing strategies (pencil, medial-axis) configure this larger.
    pub merge_distance: Option<f64>,
    /// Machine XY position the tour starts from.
    pub start_position: (f64, f64),
}

impl OperationConfig {
    /// Depth layers for this operation, top first.
    pub fn layers(&self) -> Result<Vec<Layer>> {
        Layer::slice(self.start_depth, self.end_depth, self.step_down, self.use_layers)
    }

    /// Cutoff for distance-based hierarchy linking: twice the path
    /// spacing, doubled again for step-back movement.
    pub fn hierarchy_cutoff(&self) -> f64 {
        let cutoff = 2.0 * self.path_spacing;
        if self.movement.parallel_step_back {
            cutoff * 2.0
        } else {
            cutoff
        }
    }
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            start_depth: 0.0,
            end_depth: -5.0,
            step_down: 1.0,
            use_layers: true,
            path_spacing: 1.5,
            along_path_step: 0.5,
            movement: MovementPolicy::default(),
            cutter_diameter: 3.175,
            ramp: RampConfig::default(),
            lead: LeadConfig::default(),
            optimize: OptimizeConfig::default(),
            hierarchy: HierarchyPolicy::Distance,
            merge_distance: None,
            start_position: (0.0, 0.0),
        }
    }
}
