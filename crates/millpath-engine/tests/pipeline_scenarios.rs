//! End-to-end pipeline scenarios over a synthetic raster surface.

use millpath_core::chunk::ChunkBuilder;
use millpath_core::config::{HierarchyPolicy, OperationConfig};
use millpath_core::geom::Point;
use millpath_core::sampler::RasterSampler;
use millpath_engine::Pipeline;

fn square_builder(x: f64, y: f64, size: f64) -> ChunkBuilder {
    let mut b = ChunkBuilder::new();
    b.set_closed(true);
    for (px, py) in [
        (x, y),
        (x + size, y),
        (x + size, y + size),
        (x, y + size),
        (x, y),
    ] {
        b.push(Point::new(px, py, 0.0));
    }
    b
}

fn scan_builder(y: f64, x0: f64, x1: f64, step: f64) -> ChunkBuilder {
    let mut b = ChunkBuilder::new();
    let mut x = x0;
    while x <= x1 + 1e-9 {
        b.push(Point::new(x, y, 0.0));
        x += step;
    }
    b
}

#[test]
fn nested_contours_cut_inner_first() {
    // Island inside a pocket: the containment policy must schedule the
    // inner square before the outer one regardless of travel distance.
    let sampler = RasterSampler::flat((-5.0, -5.0), 1.0, 40, 40, -1.0);
    let config = OperationConfig {
        start_depth: 0.0,
        end_depth: -1.0,
        hierarchy: HierarchyPolicy::Containment,
        start_position: (-5.0, -5.0),
        ..Default::default()
    };
    let builders = vec![square_builder(0.0, 0.0, 20.0), square_builder(8.0, 8.0, 4.0)];
    let result = Pipeline::new(&sampler, config).run(&builders).unwrap();
    assert_eq!(result.chunks.len(), 2);
    // The inner square (side 4) comes out first.
    let first_extent = result.chunks[0].xy_length();
    let second_extent = result.chunks[1].xy_length();
    assert!(first_extent < second_extent);
}

#[test]
fn layered_run_descends_one_layer_at_a_time() {
    // A 3-layer cut of a deep flat pocket: three chunks per scan line,
    // scheduled upper-before-deeper.
    let sampler = RasterSampler::flat((0.0, 0.0), 1.0, 40, 10, -3.0);
    let config = OperationConfig {
        start_depth: 0.0,
        end_depth: -3.0,
        step_down: 1.0,
        use_layers: true,
        hierarchy: HierarchyPolicy::None,
        ..Default::default()
    };
    let result = Pipeline::new(&sampler, config)
        .run(&[scan_builder(5.0, 1.0, 30.0, 0.5)])
        .unwrap();
    assert_eq!(result.chunks.len(), 3);
    let depths: Vec<f64> = result
        .chunks
        .iter()
        .map(|c| c.points()[0].z)
        .collect();
    assert!(depths.windows(2).all(|w| w[1] < w[0]), "layers out of order: {depths:?}");
    for chunk in &result.chunks {
        assert!(chunk.z_start > chunk.z_end);
        for p in chunk.points() {
            assert!(p.z <= chunk.z_start + 1e-9 && p.z >= chunk.z_end - 1e-9);
        }
    }
}

#[test]
fn stepped_surface_gets_crossing_vertices() {
    // Surface steps from -0.5 to -1.5 at x=20 over two layers: both layer
    // chunks carry an explicit vertex at the boundary depth -1.
    let sampler = RasterSampler::from_fn((0.0, 0.0), 1.0, 42, 10, |x, _| {
        if x < 20.0 {
            -0.5
        } else {
            -1.5
        }
    });
    let config = OperationConfig {
        start_depth: 0.0,
        end_depth: -2.0,
        step_down: 1.0,
        use_layers: true,
        hierarchy: HierarchyPolicy::None,
        optimize: millpath_core::config::OptimizeConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let result = Pipeline::new(&sampler, config)
        .run(&[scan_builder(5.0, 1.0, 39.0, 1.0)])
        .unwrap();
    assert_eq!(result.chunks.len(), 2);
    for chunk in &result.chunks {
        assert!(
            chunk.points().iter().any(|p| (p.z + 1.0).abs() < 1e-9),
            "missing crossing vertex at the layer boundary"
        );
    }
}

#[test]
fn splice_and_decimate_compose() {
    // Two nearly touching collinear scan fragments merge into one chunk
    // and decimation collapses the redundant interior points.
    let sampler = RasterSampler::flat((0.0, 0.0), 1.0, 60, 10, -1.0);
    let config = OperationConfig {
        start_depth: 0.0,
        end_depth: -1.0,
        hierarchy: HierarchyPolicy::None,
        merge_distance: Some(1.0),
        ..Default::default()
    };
    let builders = vec![
        scan_builder(5.0, 1.0, 20.0, 0.5),
        scan_builder(5.0, 20.4, 40.0, 0.5),
    ];
    let result = Pipeline::new(&sampler, config).run(&builders).unwrap();
    assert_eq!(result.chunks.len(), 1);
    let chunk = &result.chunks[0];
    // Everything is collinear at a single depth; decimation keeps only
    // the endpoints.
    assert!(chunk.len() <= 4, "expected aggressive decimation, got {} points", chunk.len());
    assert!(chunk.first_point().unwrap().x < chunk.last_point().unwrap().x);
}

#[test]
fn warnings_surface_for_off_grid_points() {
    let sampler = RasterSampler::flat((0.0, 0.0), 1.0, 10, 10, -0.5);
    let config = OperationConfig {
        start_depth: 0.0,
        end_depth: -0.5,
        hierarchy: HierarchyPolicy::None,
        ..Default::default()
    };
    let mut b = ChunkBuilder::new();
    b.push(Point::new(5.0, 5.0, 0.0));
    b.push(Point::new(500.0, 5.0, 0.0));
    b.push(Point::new(6.0, 5.0, 0.0));
    let result = Pipeline::new(&sampler, config).run(&[b]).unwrap();
    assert!(!result.warnings.is_empty());
}
