//! 2D polygon predicates used by the hierarchy builder.
//!
//! A [`Polygon2`] is the XY projection of a chunk's boundary. Only the
//! queries the cut-order hierarchy needs are provided: strict containment,
//! boundary distance, and signed area for outer/inner classification.

use crate::geom::Point;

/// A closed 2D boundary on the motion plane.
#[derive(Debug, Clone)]
pub struct Polygon2 {
    verts: Vec<(f64, f64)>,
}

impl Polygon2 {
    /// Builds a polygon from the XY projection of chunk points.
    ///
    /// Returns `None` for fewer than three distinct vertices. A trailing
    /// vertex coincident with the first is dropped.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let mut verts: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
        if let (Some(&first), Some(&last)) = (verts.first(), verts.last()) {
            if verts.len() > 1 && (first.0 - last.0).abs() < 1e-9 && (first.1 - last.1).abs() < 1e-9
            {
                verts.pop();
            }
        }
        if verts.len() < 3 {
            return None;
        }
        Some(Self { verts })
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.verts.len()
    }

    /// True when the polygon has no vertices.
    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    /// Even-odd ray cast; points exactly on the boundary count as outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.verts.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.verts[i];
            let (xj, yj) = self.verts[j];
            if (yi > y) != (yj > y) {
                let cross_x = xi + (y - yi) / (yj - yi) * (xj - xi);
                if x < cross_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Signed area (positive for counter-clockwise winding).
    pub fn signed_area(&self) -> f64 {
        let n = self.verts.len();
        let mut sum = 0.0;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.verts[i];
            let (xj, yj) = self.verts[j];
            sum += xj * yi - xi * yj;
            j = i;
        }
        sum / 2.0
    }

    /// Minimum distance between this boundary and another.
    ///
    /// Zero when the boundaries intersect or one polygon contains the
    /// other. Otherwise the minimum vertex-to-edge distance, evaluated
    /// both ways.
    pub fn distance_to(&self, other: &Polygon2) -> f64 {
        let (sx, sy) = self.verts[0];
        let (ox, oy) = other.verts[0];
        if other.contains(sx, sy) || self.contains(ox, oy) {
            return 0.0;
        }
        let mut best = f64::INFINITY;
        for &(x, y) in &self.verts {
            best = best.min(other.boundary_distance(x, y));
        }
        for &(x, y) in &other.verts {
            best = best.min(self.boundary_distance(x, y));
        }
        best
    }

    /// Distance from a point to the nearest boundary edge.
    fn boundary_distance(&self, x: f64, y: f64) -> f64 {
        let n = self.verts.len();
        let mut best = f64::INFINITY;
        let mut j = n - 1;
        for i in 0..n {
            let (ax, ay) = self.verts[j];
            let (bx, by) = self.verts[i];
            let abx = bx - ax;
            let aby = by - ay;
            let len_sq = abx * abx + aby * aby;
            let t = if len_sq < 1e-18 {
                0.0
            } else {
                (((x - ax) * abx + (y - ay) * aby) / len_sq).clamp(0.0, 1.0)
            };
            let dx = x - (ax + abx * t);
            let dy = y - (ay + aby * t);
            best = best.min((dx * dx + dy * dy).sqrt());
            j = i;
        }
        best
    }
}
