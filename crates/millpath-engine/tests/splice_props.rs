//! Property tests for tour splicing.

use proptest::prelude::*;

use millpath_core::chunk::Chunk;
use millpath_core::geom::Point;
use millpath_core::sampler::{RasterSampler, Sampler};
use millpath_engine::tour;

fn line_chunk(x0: f64, x1: f64, z: f64) -> Chunk {
    Chunk::from_points(
        vec![Point::new(x0, 0.0, z), Point::new(x1, 0.0, z)],
        false,
        0.0,
        z,
    )
}

proptest! {
    #[test]
    fn spliced_bridge_never_dips_below_surface(
        gap in 0.05f64..0.95,
        depth in -3.0f64..-1.5,
        step in 0.05f64..0.5,
    ) {
        // Two cuts below a flat surface at -1: the bridge between them
        // must ride the surface, never the straight interpolation.
        let sampler = RasterSampler::flat((-1.0, -2.0), 1.0, 15, 5, -1.0);
        let a = line_chunk(0.0, 5.0, depth);
        let b = line_chunk(5.0 + gap, 10.0, depth);
        let mut warnings = Vec::new();
        let out = tour::splice_chunks(vec![a, b], &sampler, 1.0, step, &mut warnings);
        prop_assert_eq!(out.len(), 1);
        for p in out[0].points() {
            // Interior of the gap: these are bridge points.
            if p.x > 5.0 + 1e-9 && p.x < 5.0 + gap - 1e-9 {
                let surface = sampler.height_at(p.x, p.y).unwrap();
                prop_assert!(p.z >= surface - 1e-9, "bridge point {p:?} below surface");
            }
        }
    }

    #[test]
    fn splice_preserves_endpoints_and_motion_order(
        gap in 0.05f64..0.95,
        depth in -3.0f64..-1.5,
    ) {
        let sampler = RasterSampler::flat((-1.0, -2.0), 1.0, 15, 5, -1.0);
        let a = line_chunk(0.0, 5.0, depth);
        let b = line_chunk(5.0 + gap, 10.0, depth);
        let mut warnings = Vec::new();
        let out = tour::splice_chunks(vec![a, b], &sampler, 1.0, 0.1, &mut warnings);
        prop_assert_eq!(out.len(), 1);
        let points = out[0].points();
        prop_assert_eq!(points[0], Point::new(0.0, 0.0, depth));
        prop_assert_eq!(points[points.len() - 1], Point::new(10.0, 0.0, depth));
        prop_assert!(points.windows(2).all(|w| w[1].x >= w[0].x - 1e-9));
    }
}
