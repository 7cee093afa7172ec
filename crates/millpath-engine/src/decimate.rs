//! Point decimation: removes path points that do not measurably change
//! the cut geometry.
//!
//! A two-pointer walk keeps a point only when it deviates from the line
//! between the last kept point and its successor by more than the
//! threshold. An optional vertical-wall guard then snaps nearly plumb
//! segments back to plumb, so decimation can never turn a wall plunge
//! into a sideways drift.

use tracing::trace;

use millpath_core::chunk::Chunk;
use millpath_core::geom;

/// Decimates one chunk in place. Returns the number of points removed.
///
/// The first and last points are always kept; chunks of two points or
/// fewer are untouched. Parallel multi-axis arrays are filtered in
/// lockstep with the points.
pub fn decimate_chunk(chunk: &mut Chunk, threshold: f64, protect_vertical: Option<f64>) -> usize {
    let n = chunk.len();
    if n <= 2 || threshold <= 0.0 {
        return 0;
    }
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;
    {
        let points = chunk.points();
        let mut last_kept = 0;
        for i in 1..n - 1 {
            let d = geom::point_segment_distance(&points[i], &points[last_kept], &points[i + 1]);
            if d > threshold {
                keep[i] = true;
                last_kept = i;
            }
        }
    }
    let removed = keep.iter().filter(|&&k| !k).count();
    if removed > 0 {
        chunk.retain_indices(&keep);
    }
    // Snapping rewrites point XY only; multi-axis sweep geometry would
    // desynchronize, so those chunks keep their walls as sampled.
    if !chunk.is_multi_axis() {
        if let Some(angle_limit) = protect_vertical {
            snap_vertical_walls(chunk, angle_limit);
        }
    }
    trace!(removed, kept = chunk.len(), "chunk decimated");
    removed
}

/// Snaps the XY of the more-elevated end of nearly vertical segments to
/// its neighbour's XY when the segment leans from vertical by less than
/// `angle_limit` (radians).
fn snap_vertical_walls(chunk: &mut Chunk, angle_limit: f64) {
    let points = chunk.points_mut();
    for i in 1..points.len() {
        let a = points[i - 1];
        let b = points[i];
        let dxy = geom::dist_xy(&a, &b);
        let dz = (b.z - a.z).abs();
        if dxy < 1e-12 || dz <= dxy {
            continue;
        }
        let lean = dxy.atan2(dz);
        if lean < angle_limit {
            if b.z > a.z {
                points[i].x = a.x;
                points[i].y = a.y;
            } else {
                points[i - 1].x = b.x;
                points[i - 1].y = b.y;
            }
        }
    }
}
