//! Cut-order hierarchy between chunks.
//!
//! An edge `child -> parent` means the child must be cut before the
//! parent: material around a feature has to be removed before the feature
//! itself. Edges are stored as indices into the owning chunk slice, so
//! the graph can only ever encode scheduling order, never ownership.
//!
//! Two linking policies exist: XY proximity (raster/fill strategies) and
//! polygon containment (nested pocket/profile contours). The graph is
//! verified acyclic right after linking; a cycle is a fatal configuration
//! error for the operation.

use tracing::debug;

use millpath_core::chunk::{Chunk, ChunkId};
use millpath_core::error::{EngineError, Result};
use millpath_core::geom;
use millpath_core::polygon::Polygon2;

/// Records `child` as cut-before `parent`, keeping both edge lists in
/// sync. Self-links and duplicates are ignored.
pub fn link(chunks: &mut [Chunk], child: ChunkId, parent: ChunkId) {
    if child == parent {
        return;
    }
    if !chunks[parent].children.contains(&child) {
        chunks[parent].children.push(child);
    }
    if !chunks[child].parents.contains(&parent) {
        chunks[child].parents.push(parent);
    }
}

/// Minimum XY distance between two chunks' boundaries.
///
/// When both chunks can form a polygon the polygon distance is used;
/// otherwise a brute-force point-pair scan runs with early exit as soon
/// as a value under `cutoff` is found.
pub fn min_xy_distance(a: &Chunk, b: &Chunk, cutoff: f64) -> f64 {
    if let (Some(pa), Some(pb)) = (polygon_of(a), polygon_of(b)) {
        return pa.distance_to(&pb);
    }
    let mut best = f64::INFINITY;
    for p in a.points() {
        for q in b.points() {
            let d = geom::dist_xy(p, q);
            if d < best {
                best = d;
                if best < cutoff {
                    return best;
                }
            }
        }
    }
    best
}

fn polygon_of(chunk: &Chunk) -> Option<Polygon2> {
    if chunk.len() < 3 {
        return None;
    }
    Polygon2::from_points(chunk.points())
}

/// Distance policy over two disjoint candidate sets: every
/// (parent, child) pair whose boundaries come within `cutoff` is linked.
pub fn link_by_distance(
    chunks: &mut [Chunk],
    parent_ids: &[ChunkId],
    child_ids: &[ChunkId],
    cutoff: f64,
) {
    let mut edges = 0usize;
    for &p in parent_ids {
        for &c in child_ids {
            if p == c {
                continue;
            }
            if min_xy_distance(&chunks[p], &chunks[c], cutoff) < cutoff {
                link(chunks, c, p);
                edges += 1;
            }
        }
    }
    debug!(edges, cutoff, "distance hierarchy linked");
}

/// Distance policy within one candidate set: nearby pairs are linked with
/// the geometrically outer chunk (larger enclosed area, falling back to
/// the longer boundary) as the parent.
pub fn link_nearby(chunks: &mut [Chunk], ids: &[ChunkId], cutoff: f64) {
    for (i, &a) in ids.iter().enumerate() {
        for &b in &ids[i + 1..] {
            if min_xy_distance(&chunks[a], &chunks[b], cutoff) >= cutoff {
                continue;
            }
            let outer_first = extent(&chunks[a]) >= extent(&chunks[b]);
            let (parent, child) = if outer_first { (a, b) } else { (b, a) };
            link(chunks, child, parent);
        }
    }
}

fn extent(chunk: &Chunk) -> f64 {
    match polygon_of(chunk) {
        Some(poly) => poly.signed_area().abs(),
        None => chunk.xy_length(),
    }
}

/// Containment policy: a chunk becomes a child of every other chunk whose
/// polygon strictly contains its first boundary point (an island inside
/// an outer contour is cut first).
pub fn link_by_containment(chunks: &mut [Chunk], ids: &[ChunkId]) {
    let polygons: Vec<Option<Polygon2>> = ids.iter().map(|&id| polygon_of(&chunks[id])).collect();
    for (ci, &c) in ids.iter().enumerate() {
        let Some(probe) = chunks[c].first_point().copied() else {
            continue;
        };
        for (pi, &p) in ids.iter().enumerate() {
            if ci == pi {
                continue;
            }
            if let Some(poly) = &polygons[pi] {
                if poly.contains(probe.x, probe.y) {
                    link(chunks, c, p);
                }
            }
        }
    }
}

/// Links two chunks of the same pattern run by point-to-point proximity:
/// the earlier chunk is cut first (becomes the child) when any point pair
/// comes within `cutoff`. Returns whether an edge was added.
pub fn link_by_proximity(
    chunks: &mut [Chunk],
    earlier: ChunkId,
    later: ChunkId,
    cutoff: f64,
) -> bool {
    if min_xy_distance(&chunks[earlier], &chunks[later], cutoff) < cutoff {
        link(chunks, earlier, later);
        true
    } else {
        false
    }
}

/// Verifies the cut-order graph is a DAG (Kahn's algorithm over the
/// child edges). The scheduling loop would otherwise never terminate, so
/// a cycle aborts the operation up front.
pub fn verify_acyclic(chunks: &[Chunk]) -> Result<()> {
    let n = chunks.len();
    let mut pending: Vec<usize> = chunks.iter().map(|c| c.children.len()).collect();
    let mut queue: Vec<ChunkId> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut visited = 0usize;
    while let Some(id) = queue.pop() {
        visited += 1;
        for &p in &chunks[id].parents {
            pending[p] -= 1;
            if pending[p] == 0 {
                queue.push(p);
            }
        }
    }
    if visited < n {
        let chunk = pending
            .iter()
            .position(|&d| d > 0)
            .unwrap_or(0);
        return Err(EngineError::HierarchyCycle { chunk });
    }
    Ok(())
}
