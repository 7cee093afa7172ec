//! # Millpath Core
//!
//! Data model and leaf services for the Millpath toolpath engine:
//!
//! - **Chunk / ChunkBuilder**: the point-sequence unit of scheduling with
//!   its mutation API and cut-order metadata.
//! - **Samplers**: two interchangeable height-query backends (raster
//!   height field and exact drop-cutter) answering "highest safe Z at
//!   (x, y)".
//! - **Movement policy**: explicit climb/conventional/meander and spindle
//!   direction value passed to every direction-sensitive component.
//! - **Configuration**: operation parameters and depth-layer slicing.
//! - **Errors**: the typed failure taxonomy and the non-fatal warning
//!   list accumulated per operation.
//!
//! The pipeline stages that consume these types live in
//! `millpath-engine`.

pub mod chunk;
pub mod config;
pub mod error;
pub mod geom;
pub mod movement;
pub mod polygon;
pub mod sampler;

pub use chunk::{Chunk, ChunkBuilder, ChunkId, DEDUPE_EPSILON_SQ};
pub use config::{
    Bounds, HierarchyPolicy, Layer, LeadConfig, OperationConfig, OptimizeConfig, RampConfig,
    RampStyle,
};
pub use error::{EngineError, Result, Warning};
pub use geom::{Point, Rotation};
pub use movement::{MillingType, MovementPolicy, SpindleDirection};
pub use polygon::Polygon2;
pub use sampler::{CollisionQuery, ExactSampler, RasterSampler, Sampler};
