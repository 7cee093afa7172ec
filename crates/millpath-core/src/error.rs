//! Error handling for the Millpath chunk engine.
//!
//! Two severities exist:
//! - [`EngineError`]: structural problems that abort the enclosing
//!   operation (never a whole batch of operations).
//! - [`Warning`]: non-fatal anomalies recovered in place and accumulated
//!   into a per-operation list surfaced to the caller.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Fatal error for one toolpath-generation operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Operation start depth lies below its end depth
    #[error("Start depth {start_depth} is below end depth {end_depth}")]
    DepthOrder {
        /// The configured top of the cut (machine Z).
        start_depth: f64,
        /// The configured bottom of the cut (machine Z).
        end_depth: f64,
    },

    /// The cut-order graph is not a DAG
    #[error("Cut-order hierarchy contains a cycle through chunk {chunk}")]
    HierarchyCycle {
        /// Index of a chunk participating in the cycle.
        chunk: usize,
    },

    /// Geometry collapsed to nothing before processing could begin
    #[error("Degenerate geometry: {reason}")]
    DegenerateGeometry {
        /// What collapsed and where.
        reason: String,
    },

    /// No input chunks were supplied
    #[error("No input chunks to process")]
    EmptyInput,

    /// The caller raised the cancellation flag
    #[error("Operation cancelled")]
    Cancelled,
}

/// Non-fatal anomaly recorded while processing one operation.
///
/// Warnings never stop processing of other chunks; they are collected and
/// handed back alongside the finished toolpath.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A chunk collapsed to fewer than two points after deduplication and
    /// was dropped.
    DegenerateChunkDropped {
        /// Index of the source pattern chunk.
        index: usize,
    },
    /// The sampler reported no material at a queried position; the
    /// previous height was carried forward.
    SamplerGap { x: f64, y: f64 },
    /// Two consecutive chunks in the tour were close but above the merge
    /// distance; a retract/plunge pair will separate them downstream.
    UnmergedGap { gap: f64 },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::DegenerateChunkDropped { index } => {
                write!(f, "Pattern chunk {} degenerated to nothing and was dropped", index)
            }
            Warning::SamplerGap { x, y } => {
                write!(f, "No material under ({:.3}, {:.3}); carrying previous height", x, y)
            }
            Warning::UnmergedGap { gap } => {
                write!(f, "Gap of {:.3} left unmerged; retract/plunge required", gap)
            }
        }
    }
}

/// Result type using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;
