//! Property tests for the chunk data model.

use proptest::prelude::*;

use millpath_core::chunk::Chunk;
use millpath_core::config::Layer;
use millpath_core::geom::Point;

fn arb_points(max: usize) -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec(
        (-100.0f64..100.0, -100.0f64..100.0, -10.0f64..0.0)
            .prop_map(|(x, y, z)| Point::new(x, y, z)),
        2..max,
    )
}

proptest! {
    #[test]
    fn dedupe_is_idempotent(points in arb_points(40)) {
        let mut chunk = Chunk::from_points(points, false, 0.0, -1.0);
        chunk.dedupe_points();
        let after_first: Vec<Point> = chunk.points().to_vec();
        let removed_again = chunk.dedupe_points();
        prop_assert_eq!(removed_again, 0);
        prop_assert_eq!(chunk.points(), &after_first[..]);
    }

    #[test]
    fn reverse_twice_is_identity(points in arb_points(40)) {
        let original = Chunk::from_points(points, false, 0.0, -1.0);
        let mut chunk = original.clone();
        chunk.reverse();
        chunk.reverse();
        prop_assert_eq!(chunk, original);
    }

    #[test]
    fn reverse_preserves_length(points in arb_points(40)) {
        let mut chunk = Chunk::from_points(points, false, 0.0, -1.0);
        let before = chunk.get_length();
        chunk.reverse();
        prop_assert!((chunk.get_length() - before).abs() < 1e-6);
    }

    #[test]
    fn layers_tile_the_depth_range(
        depth in 0.1f64..50.0,
        step in 0.1f64..10.0,
    ) {
        let layers = Layer::slice(0.0, -depth, step, true).unwrap();
        prop_assert!(!layers.is_empty());
        prop_assert_eq!(layers[0].top, 0.0);
        prop_assert!((layers[layers.len() - 1].bottom + depth).abs() < 1e-9);
        for pair in layers.windows(2) {
            prop_assert!((pair[0].bottom - pair[1].top).abs() < 1e-12);
        }
        for layer in &layers {
            prop_assert!(layer.thickness() > 0.0);
            prop_assert!(layer.thickness() <= step + 1e-9);
        }
    }
}
