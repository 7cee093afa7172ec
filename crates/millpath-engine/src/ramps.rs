//! Entry post-processing: rewrites the vertical plunge of a finalized
//! chunk into a gradual descent, and adds tangential lead arcs at the
//! entry/exit of closed contours.
//!
//! All functions operate on one depth-clamped chunk and its
//! `[z_start, z_end]` layer bounds. Multi-axis chunks are left untouched:
//! their entries are governed by the sweep geometry, not by Z plunges.

use std::f64::consts::FRAC_PI_2;

use tracing::debug;

use millpath_core::chunk::Chunk;
use millpath_core::config::{LeadConfig, RampConfig};
use millpath_core::error::{EngineError, Result};
use millpath_core::geom::{self, Point};
use millpath_core::movement::MovementPolicy;

/// Angular step for sampled lead and helix arcs.
const ARC_STEP: f64 = 10f64.to_radians();

/// Horizontal distance needed to descend `dz` at `angle` from horizontal.
pub fn ramp_length(dz: f64, angle: f64) -> f64 {
    dz / angle.tan()
}

/// Zig-zag ramp: folds a back-and-forth traverse over the chunk's leading
/// geometry, descending linearly from `z_start` to `z_end`, then the
/// original chunk follows at full depth. With `ramp_out` enabled a
/// symmetric climb back to `z_start` is appended along the tail.
pub fn ramp_zigzag(chunk: &mut Chunk, config: &RampConfig) -> Result<()> {
    if chunk.is_empty() {
        return Err(EngineError::DegenerateGeometry {
            reason: "cannot ramp an empty chunk".to_string(),
        });
    }
    if chunk.is_multi_axis() || chunk.len() < 2 {
        return Ok(());
    }
    let dz = chunk.z_start - chunk.z_end;
    if dz <= 1e-12 {
        return Ok(());
    }
    let target = ramp_length(dz, config.angle_in);
    let entry = fold_descent(chunk.points(), target, chunk.z_start, chunk.z_end, false);
    if entry.is_empty() {
        return Ok(());
    }
    let mut rewritten = entry;
    rewritten.extend(chunk.points().iter().copied());
    if config.ramp_out {
        let climb_target = ramp_length(dz, config.angle_out);
        let mut tail: Vec<Point> = chunk.points().to_vec();
        tail.reverse();
        // Climb back out along the tail geometry, emitted in reverse so
        // Z rises from z_end to z_start.
        let out = fold_descent(&tail, climb_target, chunk.z_start, chunk.z_end, true);
        rewritten.extend(out);
    }
    *chunk.points_mut() = rewritten;
    chunk.dedupe_points();
    debug!(points = chunk.len(), "zig-zag ramp applied");
    Ok(())
}

/// Contour ramp: walks a closed chunk's own loop repeatedly, descending
/// linearly until `z_end`, then appends one full pass at `z_end`.
pub fn ramp_contour(chunk: &mut Chunk, config: &RampConfig) -> Result<()> {
    if chunk.is_empty() {
        return Err(EngineError::DegenerateGeometry {
            reason: "cannot ramp an empty chunk".to_string(),
        });
    }
    if !chunk.closed {
        return Err(EngineError::DegenerateGeometry {
            reason: "contour ramp requires a closed chunk".to_string(),
        });
    }
    if chunk.is_multi_axis() {
        return Ok(());
    }
    let dz = chunk.z_start - chunk.z_end;
    let loop_len = chunk.xy_length();
    if dz <= 1e-12 || loop_len < 1e-9 {
        return Ok(());
    }
    let per_rev = loop_len * config.angle_in.tan();
    let revs = (dz / per_rev).ceil().max(1.0) as usize;
    let total = revs as f64 * loop_len;

    let points = chunk.points().to_vec();
    let mut rewritten: Vec<Point> = Vec::with_capacity(points.len() * (revs + 1));
    let mut travelled = 0.0;
    let mut prev = points[0];
    rewritten.push(Point::new(prev.x, prev.y, chunk.z_start));
    for _ in 0..revs {
        // Skip index 0 each revolution; the closing duplicate at the end
        // of the loop already lands there.
        for p in points.iter().skip(1) {
            travelled += geom::dist_xy(&prev, p);
            let z = (chunk.z_start - dz * travelled / total).max(chunk.z_end);
            rewritten.push(Point::new(p.x, p.y, z));
            prev = *p;
        }
    }
    // One full pass at depth.
    for p in &points {
        rewritten.push(Point::new(p.x, p.y, chunk.z_end));
    }
    *chunk.points_mut() = rewritten;
    chunk.dedupe_points();
    debug!(revs, points = chunk.len(), "contour ramp applied");
    Ok(())
}

/// Helical entry: prepends a descending circle of `radius` tangent to the
/// chunk start, from `z_start` down to the first point's depth.
pub fn helix_entry(chunk: &mut Chunk, radius: f64, angle: f64) -> Result<()> {
    if chunk.len() < 2 {
        return Err(EngineError::DegenerateGeometry {
            reason: "cannot add a helix entry to a degenerate chunk".to_string(),
        });
    }
    if chunk.is_multi_axis() || radius <= 0.0 {
        return Ok(());
    }
    let Some(&p0) = chunk.first_point() else {
        return Ok(());
    };
    let dz = chunk.z_start - p0.z;
    if dz <= 1e-12 {
        return Ok(());
    }
    let Some(tangent) = leading_tangent(chunk.points()) else {
        return Ok(());
    };
    // Circle through the start point, centered one radius to its left.
    let center = (p0.x - tangent.1 * radius, p0.y + tangent.0 * radius);
    let phi_end = (p0.y - center.1).atan2(p0.x - center.0);
    let circumference = 2.0 * std::f64::consts::PI * radius;
    let per_rev = circumference * angle.tan();
    let revs = (dz / per_rev).ceil().max(1.0) as usize;
    let steps = (revs as f64 * 2.0 * std::f64::consts::PI / ARC_STEP).ceil() as usize;

    let mut entry = Vec::with_capacity(steps + 1);
    for s in 0..=steps {
        let frac = s as f64 / steps as f64;
        let theta = phi_end - (1.0 - frac) * revs as f64 * 2.0 * std::f64::consts::PI;
        let z = chunk.z_start - dz * frac;
        entry.push(Point::new(
            center.0 + radius * theta.cos(),
            center.1 + radius * theta.sin(),
            z,
        ));
    }
    entry.extend(chunk.points().iter().copied());
    *chunk.points_mut() = entry;
    chunk.dedupe_points();
    Ok(())
}

/// Inserts a synthetic midpoint into every segment longer than twice the
/// lead radius, so a later lead insertion always has room.
pub fn insert_lead_points(chunk: &mut Chunk, lead_radius: f64) {
    if chunk.is_multi_axis() || chunk.len() < 2 || lead_radius <= 0.0 {
        return;
    }
    let limit = 2.0 * lead_radius;
    let points = chunk.points();
    let mut rewritten = Vec::with_capacity(points.len());
    rewritten.push(points[0]);
    for w in points.windows(2) {
        if geom::dist_xy(&w[0], &w[1]) > limit {
            rewritten.push(geom::lerp(&w[0], &w[1], 0.5));
        }
        rewritten.push(w[1]);
    }
    *chunk.points_mut() = rewritten;
}

/// Adds tangential quarter-circle lead-in and lead-out arcs to a closed
/// chunk. The arc side follows the movement policy's spindle/milling
/// direction and flips for nested islands (`is_child`). The chunk is no
/// longer a strict loop afterwards.
pub fn add_leads(
    chunk: &mut Chunk,
    lead: &LeadConfig,
    policy: &MovementPolicy,
    is_child: bool,
) -> Result<()> {
    if chunk.is_empty() {
        return Err(EngineError::DegenerateGeometry {
            reason: "cannot add leads to an empty chunk".to_string(),
        });
    }
    if !chunk.closed || chunk.is_multi_axis() || chunk.len() < 3 || lead.radius <= 0.0 {
        return Ok(());
    }
    let side = policy.lead_side(is_child);
    let points = chunk.points();
    let p_start = points[0];
    let p_end = points[points.len() - 1];
    let Some(t_in) = leading_tangent(points) else {
        return Ok(());
    };
    let mut reversed: Vec<Point> = points.to_vec();
    reversed.reverse();
    let Some(t_out_rev) = leading_tangent(&reversed) else {
        return Ok(());
    };
    let t_out = (-t_out_rev.0, -t_out_rev.1);

    let lead_in = quarter_arc(&p_start, t_in, lead.radius, side, true);
    let lead_out = quarter_arc(&p_end, t_out, lead.radius, side, false);

    let mut rewritten = lead_in;
    rewritten.extend(points.iter().copied());
    rewritten.extend(lead_out);
    *chunk.points_mut() = rewritten;
    chunk.closed = false;
    chunk.dedupe_points();
    Ok(())
}

/// Unit tangent of the first segment with usable length, on the XY plane.
fn leading_tangent(points: &[Point]) -> Option<(f64, f64)> {
    for w in points.windows(2) {
        let dx = w[1].x - w[0].x;
        let dy = w[1].y - w[0].y;
        let len = (dx * dx + dy * dy).sqrt();
        if len > 1e-9 {
            return Some((dx / len, dy / len));
        }
    }
    None
}

/// Quarter circle tangent to direction `t` at `p`, on the side selected
/// by `side`. `into` selects whether the arc ends at `p` (lead-in) or
/// starts there (lead-out). Sampled at [`ARC_STEP`].
fn quarter_arc(p: &Point, t: (f64, f64), radius: f64, side: f64, into: bool) -> Vec<Point> {
    // Perpendicular on the chosen side; the arc center sits one radius
    // off the contour.
    let n = (-t.1 * side, t.0 * side);
    let center = (p.x + n.0 * radius, p.y + n.1 * radius);
    let phi_contact = (p.y - center.1).atan2(p.x - center.0);
    let steps = (FRAC_PI_2 / ARC_STEP).ceil() as usize;
    let mut arc = Vec::with_capacity(steps + 1);
    for s in 0..=steps {
        let frac = s as f64 / steps as f64;
        // Sweep sign `side` keeps travel tangential at the contact point.
        let theta = if into {
            phi_contact - side * FRAC_PI_2 * (1.0 - frac)
        } else {
            phi_contact + side * FRAC_PI_2 * frac
        };
        arc.push(Point::new(
            center.0 + radius * theta.cos(),
            center.1 + radius * theta.sin(),
            p.z,
        ));
    }
    arc
}

/// Builds the folded descent path used by the zig-zag ramp: traverses the
/// leading half of `target` forward and backward until the accumulated
/// length reaches `target` **and** an even number of half-passes has run
/// (so the descent lands back on the chunk start having travelled the
/// full ramp length). Z moves linearly from `z_start` to `z_end` (or the
/// reverse when `ascending`).
fn fold_descent(
    points: &[Point],
    target: f64,
    z_start: f64,
    z_end: f64,
    ascending: bool,
) -> Vec<Point> {
    // Fold the ramp length in half: the out-and-back traverse over the
    // span must total `target`, or the effective angle would be halved.
    let span = clip_span(points, target / 2.0);
    let span_len: f64 = span
        .windows(2)
        .map(|w| geom::dist_xy(&w[0], &w[1]))
        .sum();
    if span_len < 1e-9 {
        return Vec::new();
    }
    let mut half_passes = (target / span_len).ceil() as usize;
    if half_passes % 2 == 1 {
        half_passes += 1;
    }
    let half_passes = half_passes.max(2);
    let total = half_passes as f64 * span_len;
    let dz = z_start - z_end;

    let mut out: Vec<Point> = Vec::new();
    let mut travelled = 0.0;
    let mut prev: Option<Point> = None;
    for pass in 0..half_passes {
        let forward = pass % 2 == 0;
        let mut walk: Vec<Point> = span.to_vec();
        if !forward {
            walk.reverse();
        }
        for (i, p) in walk.iter().enumerate() {
            if i == 0 && pass > 0 {
                continue; // shared vertex with the previous half-pass
            }
            if let Some(q) = prev {
                travelled += geom::dist_xy(&q, p);
            }
            let frac = (travelled / total).min(1.0);
            let z = if ascending {
                z_end + dz * frac
            } else {
                z_start - dz * frac
            };
            out.push(Point::new(p.x, p.y, z));
            prev = Some(*p);
        }
    }
    out
}

/// Leading portion of a polyline clipped to `target` XY length, with an
/// interpolated final vertex when a segment straddles the limit.
fn clip_span(points: &[Point], target: f64) -> Vec<Point> {
    let mut span = vec![points[0]];
    let mut acc = 0.0;
    for w in points.windows(2) {
        let seg = geom::dist_xy(&w[0], &w[1]);
        if seg < 1e-12 {
            continue;
        }
        if acc + seg >= target {
            let t = (target - acc) / seg;
            span.push(geom::lerp(&w[0], &w[1], t));
            return span;
        }
        acc += seg;
        span.push(w[1]);
    }
    span
}
