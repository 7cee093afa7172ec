//! Layer sampling: projects 2D/N-axis candidate chunks onto the material
//! surface, one output chunk per depth layer.
//!
//! Every input point is height-queried against the sampler and the result
//! clamped into each layer's `[bottom, top]` band: points whose target
//! depth lies below the band cut the band floor, points above it ride the
//! band ceiling (the safe height for that layer). When two consecutive
//! samples straddle a layer boundary, a crossing point is interpolated at
//! the boundary and inserted into **both** adjacent layers' chunks — a
//! plain per-point assignment would leave mid-air jumps at every layer
//! transition.

use smallvec::SmallVec;
use tracing::{debug, warn};

use millpath_core::chunk::{Chunk, ChunkBuilder, ChunkId};
use millpath_core::config::{Layer, OperationConfig};
use millpath_core::error::{EngineError, Result, Warning};
use millpath_core::geom::{self, Point, Rotation};
use millpath_core::sampler::Sampler;

use crate::hierarchy;
use crate::progress::CancelToken;

/// At most this many no-material warnings are recorded per input chunk.
const MAX_GAP_WARNINGS: usize = 4;

/// One interpolated multi-axis sample.
struct AxisSample {
    start: Point,
    end: Point,
    rotation: Rotation,
}

/// Samples every builder against the sampler and splits it into one
/// finalized chunk per depth layer.
///
/// Consecutive layers of the same builder are linked
/// upper-as-child-of-deeper, so the slab above is always cut first.
/// Chunks that collapse below two points after deduplication are dropped
/// with a warning; processing of the remaining chunks continues.
pub fn sample_chunks(
    builders: &[ChunkBuilder],
    sampler: &dyn Sampler,
    layers: &[Layer],
    config: &OperationConfig,
    cancel: &CancelToken,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<Chunk>> {
    debug_assert!(!layers.is_empty());
    let mut chunks: Vec<Chunk> = Vec::new();

    for (index, builder) in builders.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if builder.is_empty() {
            warnings.push(Warning::DegenerateChunkDropped { index });
            continue;
        }
        if !builder.axes_consistent() {
            return Err(EngineError::DegenerateGeometry {
                reason: format!("pattern chunk {index} mixes plain and multi-axis samples"),
            });
        }

        let mut accs: Vec<ChunkBuilder> = layers
            .iter()
            .map(|_| {
                let mut acc = ChunkBuilder::new();
                acc.set_closed(builder.is_closed());
                acc
            })
            .collect();

        let multi = builder.is_multi_axis();
        let mut gap_warnings = 0usize;
        let mut prev: Option<Point> = None;

        for i in 0..builder.len() {
            let pt = *builder.point_at(i);
            let sampled = if multi {
                let (start, end) = builder.sweep_at(i).expect("multi-axis arrays parallel points");
                sampler.swept_height_at(start, end)
            } else {
                sampler.height_at(pt.x, pt.y)
            };
            let z = match sampled {
                Some(z) => z,
                None => {
                    // No material here: carry the previous height rather
                    // than terminating the chunk.
                    if gap_warnings < MAX_GAP_WARNINGS {
                        warnings.push(Warning::SamplerGap { x: pt.x, y: pt.y });
                        gap_warnings += 1;
                    }
                    prev.map_or(layers[0].top, |p| p.z)
                }
            };
            let z = z.max(config.end_depth);
            let cur = Point::new(pt.x, pt.y, z);

            if let Some(prev_pt) = prev {
                insert_boundary_crossings(&mut accs, layers, builder, i, &prev_pt, &cur, multi);
            }
            for (k, layer) in layers.iter().enumerate() {
                let clamped = Point::new(pt.x, pt.y, z.clamp(layer.bottom, layer.top));
                if multi {
                    let (start, end) = builder.sweep_at(i).expect("checked above");
                    let rot = *builder.rotation_at(i).expect("checked above");
                    accs[k].push_sample(clamped, *start, *end, rot);
                } else {
                    accs[k].push(clamped);
                }
            }
            prev = Some(cur);
        }

        let mut produced: Vec<ChunkId> = Vec::with_capacity(layers.len());
        for (acc, layer) in accs.into_iter().zip(layers) {
            if acc.is_empty() {
                continue;
            }
            let mut chunk = acc.finalize(layer.top, layer.bottom);
            chunk.dedupe_points();
            if chunk.len() < 2 {
                warnings.push(Warning::DegenerateChunkDropped { index });
                continue;
            }
            produced.push(chunks.len());
            chunks.push(chunk);
        }
        // The upper slab must be removed before the one below it.
        for pair in produced.windows(2) {
            hierarchy::link(&mut chunks, pair[0], pair[1]);
        }
    }

    debug!(
        inputs = builders.len(),
        layers = layers.len(),
        outputs = chunks.len(),
        "layer sampling complete"
    );
    if chunks.is_empty() {
        warn!("all pattern chunks degenerated during sampling");
    }
    Ok(chunks)
}

/// Inserts an interpolated crossing point into both layers adjacent to
/// every boundary the segment `prev -> cur` passes through, ordered along
/// the direction of travel.
fn insert_boundary_crossings(
    accs: &mut [ChunkBuilder],
    layers: &[Layer],
    builder: &ChunkBuilder,
    i: usize,
    prev: &Point,
    cur: &Point,
    multi: bool,
) {
    let (lo, hi) = if prev.z <= cur.z {
        (prev.z, cur.z)
    } else {
        (cur.z, prev.z)
    };
    // Interior boundaries: layers[k].top == layers[k - 1].bottom.
    let mut crossed: SmallVec<[usize; 2]> = SmallVec::new();
    for k in 1..layers.len() {
        let b = layers[k].top;
        if b > lo && b < hi {
            crossed.push(k);
        }
    }
    if crossed.is_empty() {
        return;
    }
    // Descending travel hits boundaries top-down (ascending k); climbing
    // travel hits them in reverse.
    if cur.z > prev.z {
        crossed.reverse();
    }
    for k in crossed {
        let b = layers[k].top;
        let t = (b - prev.z) / (cur.z - prev.z);
        let mut crossing = geom::lerp(prev, cur, t);
        crossing.z = b;
        let axis = if multi {
            let (s0, e0) = builder.sweep_at(i - 1).expect("multi-axis arrays parallel points");
            let (s1, e1) = builder.sweep_at(i).expect("multi-axis arrays parallel points");
            let r0 = builder.rotation_at(i - 1).expect("checked above");
            let r1 = builder.rotation_at(i).expect("checked above");
            Some(AxisSample {
                start: geom::lerp(s0, s1, t),
                end: geom::lerp(e0, e1, t),
                rotation: geom::lerp_vec(r0, r1, t),
            })
        } else {
            None
        };
        for layer_idx in [k - 1, k] {
            match &axis {
                Some(a) => accs[layer_idx].push_sample(crossing, a.start, a.end, a.rotation),
                None => accs[layer_idx].push(crossing),
            }
        }
    }
}
