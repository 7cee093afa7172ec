//! Tour solving: linearizes the cut-order hierarchy into a
//! travel-minimizing visiting order, then splices near-touching
//! neighbours into continuous motions.
//!
//! The solver is a greedy nearest-neighbour walk constrained by the
//! hierarchy: a chunk becomes eligible only once all of its children are
//! scheduled. Starvation with unsorted chunks remaining means the graph
//! was cyclic and is reported as such rather than spinning.

use tracing::{debug, trace};

use millpath_core::chunk::{Chunk, ChunkId};
use millpath_core::error::{EngineError, Result, Warning};
use millpath_core::geom::{self, Point};
use millpath_core::movement::MovementPolicy;
use millpath_core::sampler::Sampler;

use crate::progress::CancelToken;

/// Orders all chunks into a tour. On success every chunk is `sorted`,
/// its entry point adapted exactly once, and the returned ids satisfy
/// every child-before-parent constraint.
pub fn sort_chunks(
    chunks: &mut [Chunk],
    start: (f64, f64),
    policy: &MovementPolicy,
    cancel: &CancelToken,
) -> Result<Vec<ChunkId>> {
    let n = chunks.len();
    let mut order = Vec::with_capacity(n);
    let mut pos = Point::new(start.0, start.1, 0.0);
    let mut last: Option<ChunkId> = None;

    for _ in 0..n {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let next = match last {
            Some(l) if !chunks[l].parents.is_empty() => {
                nearest_in_parent_chain(chunks, l, &pos, policy)
                    .or_else(|| nearest_eligible(chunks, &pos, policy))
            }
            _ => nearest_eligible(chunks, &pos, policy),
        };
        let Some(id) = next else {
            // Unsorted chunks remain but none can become eligible.
            let stuck = chunks
                .iter()
                .position(|c| !c.sorted)
                .unwrap_or(0);
            return Err(EngineError::HierarchyCycle { chunk: stuck });
        };
        chunks[id].adapt_distance(&pos, policy);
        chunks[id].sorted = true;
        if let Some(p) = chunks[id].last_point() {
            pos = *p;
        }
        trace!(chunk = id, "scheduled");
        order.push(id);
        last = Some(id);
    }
    debug!(chunks = n, "tour solved");
    Ok(order)
}

/// A chunk is eligible once all the work it depends on is scheduled.
fn eligible(chunks: &[Chunk], id: ChunkId) -> bool {
    !chunks[id].sorted && chunks[id].children.iter().all(|&c| chunks[c].sorted)
}

/// Globally nearest eligible chunk.
fn nearest_eligible(chunks: &[Chunk], pos: &Point, policy: &MovementPolicy) -> Option<ChunkId> {
    let mut best: Option<(f64, ChunkId)> = None;
    for id in 0..chunks.len() {
        if !eligible(chunks, id) {
            continue;
        }
        let d = chunks[id].distance(pos, policy);
        if best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, id));
        }
    }
    best.map(|(_, id)| id)
}

/// Nearest eligible chunk reachable through the last chunk's parent
/// chain and the unsorted descendants hanging off it. Iterative with an
/// explicit stack; hierarchies can nest arbitrarily deep.
fn nearest_in_parent_chain(
    chunks: &[Chunk],
    last: ChunkId,
    pos: &Point,
    policy: &MovementPolicy,
) -> Option<ChunkId> {
    let mut best: Option<(f64, ChunkId)> = None;
    let mut seen = vec![false; chunks.len()];
    let mut stack: Vec<ChunkId> = chunks[last].parents.clone();
    while let Some(id) = stack.pop() {
        if seen[id] {
            continue;
        }
        seen[id] = true;
        if eligible(chunks, id) {
            let d = chunks[id].distance(pos, policy);
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, id));
            }
        } else if !chunks[id].sorted {
            // Descend to the work blocking this parent.
            for &c in &chunks[id].children {
                if !chunks[c].sorted {
                    stack.push(c);
                }
            }
        }
        for &p in &chunks[id].parents {
            if !chunks[p].sorted {
                stack.push(p);
            }
        }
    }
    best.map(|(_, id)| id)
}

/// Splices consecutive tour chunks whose XY gap is under
/// `merge_distance` into one continuous chunk, bridging the gap with a
/// resampled sub-path so the splice never plunges through material.
/// Chunks that stay separate get a retract/plunge pair from the
/// downstream emission stage.
pub fn splice_chunks(
    scheduled: Vec<Chunk>,
    sampler: &dyn Sampler,
    merge_distance: f64,
    step: f64,
    warnings: &mut Vec<Warning>,
) -> Vec<Chunk> {
    let mut out: Vec<Chunk> = Vec::with_capacity(scheduled.len());
    for chunk in scheduled {
        let Some(prev) = out.last_mut() else {
            out.push(chunk);
            continue;
        };
        let gap = prev.xy_gap_to(&chunk);
        if gap >= merge_distance {
            out.push(chunk);
            continue;
        }
        if prev.is_multi_axis() || chunk.is_multi_axis() {
            // Bridges carry no orientation data; multi-axis chunks keep
            // their retract.
            warnings.push(Warning::UnmergedGap { gap });
            out.push(chunk);
            continue;
        }
        let (Some(&from), Some(&to)) = (prev.last_point(), chunk.first_point()) else {
            out.push(chunk);
            continue;
        };
        for bridge_point in bridge(&from, &to, sampler, step) {
            prev.append(bridge_point);
        }
        prev.extend(chunk.points().iter().copied());
        prev.closed = false;
        prev.z_start = prev.z_start.max(chunk.z_start);
        prev.z_end = prev.z_end.min(chunk.z_end);
        for p in &chunk.parents {
            if !prev.parents.contains(p) {
                prev.parents.push(*p);
            }
        }
        for c in &chunk.children {
            if !prev.children.contains(c) {
                prev.children.push(*c);
            }
        }
        prev.dedupe_points();
    }
    debug!(chunks = out.len(), "splice complete");
    out
}

/// Interior points of the bridge `from -> to`, subdivided at the
/// along-path step and lifted to the sampled surface where the straight
/// interpolation would dip below it.
fn bridge(from: &Point, to: &Point, sampler: &dyn Sampler, step: f64) -> Vec<Point> {
    let gap = geom::dist_xy(from, to);
    if gap < 1e-12 {
        return Vec::new();
    }
    let step = if step > 0.0 { step } else { gap };
    let count = (gap / step).ceil().max(1.0) as usize;
    let mut points = Vec::with_capacity(count.saturating_sub(1));
    for i in 1..count {
        let t = i as f64 / count as f64;
        let mut p = geom::lerp(from, to, t);
        if let Some(surface) = sampler.height_at(p.x, p.y) {
            if surface > p.z {
                p.z = surface;
            }
        }
        points.push(p);
    }
    points
}
