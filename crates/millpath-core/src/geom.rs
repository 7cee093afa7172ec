//! Shared geometry helpers for the chunk engine.
//!
//! Machine space is right-handed: XY is the motion plane, Z is depth
//! (negative values lie below the stock top).

use nalgebra::{Point3, Vector3};

/// A machine-space coordinate.
pub type Point = Point3<f64>;
/// A machine orientation for multi-axis samples (Euler angles).
pub type Rotation = Vector3<f64>;

/// Squared 3D distance between two points.
pub fn dist_sq(a: &Point, b: &Point) -> f64 {
    (b - a).norm_squared()
}

/// 3D distance between two points.
pub fn dist(a: &Point, b: &Point) -> f64 {
    (b - a).norm()
}

/// Distance between two points projected onto the motion plane.
pub fn dist_xy(a: &Point, b: &Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// Linear interpolation between two points.
pub fn lerp(a: &Point, b: &Point, t: f64) -> Point {
    a + (b - a) * t
}

/// Linear interpolation between two orientation vectors.
pub fn lerp_vec(a: &Rotation, b: &Rotation, t: f64) -> Rotation {
    a + (b - a) * t
}

/// Perpendicular distance from `p` to the segment `a -> b`.
///
/// Falls back to the plain point distance when the segment is degenerate,
/// so duplicate points never produce NaN.
pub fn point_segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-18 {
        return dist(p, a);
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    dist(p, &(a + ab * t))
}
