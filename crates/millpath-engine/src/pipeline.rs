//! The chunk pipeline: candidate chunks in, ordered toolpath out.
//!
//! Stages run in a fixed order — layer sampling, hierarchy linking, tour
//! solving, splicing, decimation, entry post-processing. Each stage
//! reports coarse progress and checks the cancel token, so a UI can abort
//! a long operation between stages without poisoning anything.

use tracing::{debug, info};

use millpath_core::chunk::{Chunk, ChunkBuilder, ChunkId};
use millpath_core::config::{HierarchyPolicy, OperationConfig, RampStyle};
use millpath_core::error::{EngineError, Result, Warning};
use millpath_core::sampler::Sampler;

use crate::progress::{CancelToken, ProgressFn};
use crate::{decimate, hierarchy, layering, ramps, tour};

/// Output of one pipeline run: the scheduled chunks in cutting order,
/// plus everything worth telling the operator about.
#[derive(Debug)]
pub struct ToolpathResult {
    pub chunks: Vec<Chunk>,
    pub warnings: Vec<Warning>,
}

/// One configured run of the chunk engine against a sampler.
pub struct Pipeline<'a> {
    sampler: &'a dyn Sampler,
    config: OperationConfig,
    cancel: CancelToken,
    progress: Option<ProgressFn>,
}

impl<'a> Pipeline<'a> {
    pub fn new(sampler: &'a dyn Sampler, config: OperationConfig) -> Self {
        Self {
            sampler,
            config,
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    /// Shares a cancel token with the caller; cancelling it makes the run
    /// return [`EngineError::Cancelled`] at the next stage boundary.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Registers a progress callback, called with a fraction in `[0, 1]`.
    pub fn with_progress(mut self, progress: impl Fn(f32) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    fn report(&self, fraction: f32) {
        if let Some(progress) = &self.progress {
            progress(fraction);
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }

    /// Runs the full pipeline over the candidate chunks.
    pub fn run(&self, builders: &[ChunkBuilder]) -> Result<ToolpathResult> {
        if builders.is_empty() {
            return Err(EngineError::EmptyInput);
        }
        // Configuration errors surface before any sampling work.
        let layers = self.config.layers()?;
        info!(
            inputs = builders.len(),
            layers = layers.len(),
            "pipeline starting"
        );
        self.report(0.0);
        let mut warnings = Vec::new();

        let mut chunks = layering::sample_chunks(
            builders,
            self.sampler,
            &layers,
            &self.config,
            &self.cancel,
            &mut warnings,
        )?;
        self.report(0.4);
        if chunks.is_empty() {
            return Ok(ToolpathResult {
                chunks,
                warnings,
            });
        }

        self.link_hierarchy(&mut chunks);
        hierarchy::verify_acyclic(&chunks)?;
        self.report(0.5);

        let order = tour::sort_chunks(
            &mut chunks,
            self.config.start_position,
            &self.config.movement,
            &self.cancel,
        )?;
        let mut chunks = reorder(chunks, &order);
        self.report(0.7);

        if let Some(merge_distance) = self.config.merge_distance {
            chunks = tour::splice_chunks(
                chunks,
                self.sampler,
                merge_distance,
                self.config.along_path_step,
                &mut warnings,
            );
        }
        self.check_cancelled()?;
        self.report(0.8);

        if self.config.optimize.enabled {
            let protect = self
                .config
                .optimize
                .protect_vertical
                .then_some(self.config.optimize.protect_vertical_limit);
            let mut removed = 0usize;
            for chunk in &mut chunks {
                removed += decimate::decimate_chunk(chunk, self.config.optimize.threshold, protect);
            }
            debug!(removed, "decimation pass complete");
        }
        self.check_cancelled()?;
        self.report(0.9);

        self.apply_entries(&mut chunks)?;
        self.report(1.0);
        info!(chunks = chunks.len(), warnings = warnings.len(), "pipeline finished");
        Ok(ToolpathResult { chunks, warnings })
    }

    fn link_hierarchy(&self, chunks: &mut [Chunk]) {
        let ids: Vec<ChunkId> = (0..chunks.len()).collect();
        match self.config.hierarchy {
            HierarchyPolicy::None => {}
            HierarchyPolicy::Distance => {
                hierarchy::link_nearby(chunks, &ids, self.config.hierarchy_cutoff());
            }
            HierarchyPolicy::Containment => {
                hierarchy::link_by_containment(chunks, &ids);
            }
        }
    }

    /// Ramp and lead post-processing, applied per chunk after scheduling
    /// so arcs and descents survive decimation untouched.
    fn apply_entries(&self, chunks: &mut Vec<Chunk>) -> Result<()> {
        if self.config.ramp.enabled {
            for chunk in chunks.iter_mut() {
                match self.config.ramp.style {
                    RampStyle::ZigZag => ramps::ramp_zigzag(chunk, &self.config.ramp)?,
                    RampStyle::Contour if chunk.closed => {
                        ramps::ramp_contour(chunk, &self.config.ramp)?
                    }
                    // Open chunks cannot descend along their own loop.
                    RampStyle::Contour => ramps::ramp_zigzag(chunk, &self.config.ramp)?,
                    RampStyle::Helix => ramps::helix_entry(
                        chunk,
                        self.config.lead.radius,
                        self.config.ramp.angle_in,
                    )?,
                }
            }
        }
        if self.config.lead.enabled && self.config.lead.radius > 0.0 {
            for chunk in chunks.iter_mut() {
                if !chunk.closed || chunk.is_multi_axis() {
                    continue;
                }
                let is_child = !chunk.parents.is_empty();
                ramps::insert_lead_points(chunk, self.config.lead.radius);
                ramps::add_leads(chunk, &self.config.lead, &self.config.movement, is_child)?;
            }
        }
        Ok(())
    }
}

/// Rearranges the owned chunks into tour order. Hierarchy ids inside the
/// chunks refer to pre-tour indices afterwards; scheduling is done with
/// them by this point.
fn reorder(chunks: Vec<Chunk>, order: &[ChunkId]) -> Vec<Chunk> {
    let mut slots: Vec<Option<Chunk>> = chunks.into_iter().map(Some).collect();
    order
        .iter()
        .filter_map(|&id| slots[id].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use millpath_core::geom::Point;
    use millpath_core::sampler::RasterSampler;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn line_builder(x0: f64, x1: f64, y: f64) -> ChunkBuilder {
        let mut b = ChunkBuilder::new();
        b.push(Point::new(x0, y, 0.0));
        b.push(Point::new(x1, y, 0.0));
        b
    }

    fn basic_config() -> OperationConfig {
        OperationConfig {
            start_depth: 0.0,
            end_depth: -1.0,
            step_down: 1.0,
            hierarchy: HierarchyPolicy::None,
            ..Default::default()
        }
    }

    #[test]
    fn test_run_rejects_empty_input() {
        let sampler = RasterSampler::flat((0.0, 0.0), 1.0, 4, 4, -1.0);
        let err = Pipeline::new(&sampler, basic_config()).run(&[]).unwrap_err();
        assert_eq!(err, EngineError::EmptyInput);
    }

    #[test]
    fn test_run_orders_by_travel_distance() {
        let sampler = RasterSampler::flat((0.0, 0.0), 1.0, 100, 10, -1.0);
        let builders = vec![
            line_builder(50.0, 60.0, 5.0),
            line_builder(1.0, 10.0, 5.0),
            line_builder(20.0, 30.0, 5.0),
        ];
        let result = Pipeline::new(&sampler, basic_config()).run(&builders).unwrap();
        assert_eq!(result.chunks.len(), 3);
        let starts: Vec<f64> = result
            .chunks
            .iter()
            .map(|c| c.first_point().unwrap().x)
            .collect();
        assert!(starts[0] < starts[1] && starts[1] < starts[2]);
        for chunk in &result.chunks {
            assert!(chunk.sorted);
            for p in chunk.points() {
                assert!((p.z + 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_run_splices_when_merge_configured() {
        let sampler = RasterSampler::flat((0.0, 0.0), 1.0, 100, 10, -1.0);
        let builders = vec![line_builder(1.0, 10.0, 5.0), line_builder(10.4, 20.0, 5.0)];
        let config = OperationConfig {
            merge_distance: Some(1.0),
            ..basic_config()
        };
        let result = Pipeline::new(&sampler, config).run(&builders).unwrap();
        assert_eq!(result.chunks.len(), 1);
    }

    #[test]
    fn test_run_reports_progress_and_completion() {
        let sampler = RasterSampler::flat((0.0, 0.0), 1.0, 20, 10, -1.0);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let result = Pipeline::new(&sampler, basic_config())
            .with_progress(move |f| {
                assert!((0.0..=1.0).contains(&f));
                seen.fetch_add(1, Ordering::Relaxed);
            })
            .run(&[line_builder(1.0, 10.0, 5.0)])
            .unwrap();
        assert_eq!(result.chunks.len(), 1);
        assert!(calls.load(Ordering::Relaxed) >= 2);
    }

    #[test]
    fn test_run_cancelled_before_start() {
        let sampler = RasterSampler::flat((0.0, 0.0), 1.0, 20, 10, -1.0);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = Pipeline::new(&sampler, basic_config())
            .with_cancel(cancel)
            .run(&[line_builder(1.0, 10.0, 5.0)])
            .unwrap_err();
        assert_eq!(err, EngineError::Cancelled);
    }

    #[test]
    fn test_run_fails_fast_on_inverted_depths() {
        let sampler = RasterSampler::flat((0.0, 0.0), 1.0, 4, 4, -1.0);
        let config = OperationConfig {
            start_depth: -5.0,
            end_depth: 0.0,
            ..basic_config()
        };
        let err = Pipeline::new(&sampler, config)
            .run(&[line_builder(1.0, 2.0, 1.0)])
            .unwrap_err();
        assert!(matches!(err, EngineError::DepthOrder { .. }));
    }

    #[test]
    fn test_run_with_ramp_keeps_first_point_above_depth() {
        let sampler = RasterSampler::flat((0.0, 0.0), 1.0, 100, 10, -1.0);
        let mut config = basic_config();
        config.ramp.enabled = true;
        config.ramp.angle_in = 45f64.to_radians();
        let result = Pipeline::new(&sampler, config)
            .run(&[line_builder(1.0, 40.0, 5.0)])
            .unwrap();
        let first = result.chunks[0].points()[0];
        assert!(first.z > -1.0);
    }
}
