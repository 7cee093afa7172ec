//! Toolpath chunk engine.
//!
//! Takes candidate chunks produced by a machining strategy, projects them
//! onto the sampled material surface in depth layers, links and solves
//! the cut-order hierarchy, and post-processes entries. The output is a
//! list of chunks in cutting order, ready for g-code emission.
//!
//! [`pipeline::Pipeline`] drives the whole sequence; the stage modules
//! are public for strategies that need finer control.

pub mod decimate;
pub mod hierarchy;
pub mod layering;
pub mod pipeline;
pub mod progress;
pub mod ramps;
pub mod tour;

pub use pipeline::{Pipeline, ToolpathResult};
pub use progress::{CancelToken, ProgressFn};
