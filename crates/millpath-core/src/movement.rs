//! Movement policy for direction and reversal decisions.
//!
//! One explicit [`MovementPolicy`] value is passed to every component that
//! needs it (chunk entry selection, lead arc side, hierarchy cutoff),
//! instead of re-deriving direction flags per call site.

use serde::{Deserialize, Serialize};

/// Relationship between cutter rotation and feed direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MillingType {
    /// Cutter rotation pulls into the cut; fixed direction.
    Climb,
    /// Cutter rotation pushes against the feed; fixed direction.
    Conventional,
    /// Direction-agnostic; open chunks may be entered from either end.
    Meander,
}

impl MillingType {
    /// Returns the name of the milling type.
    pub fn name(&self) -> &'static str {
        match self {
            MillingType::Climb => "Climb",
            MillingType::Conventional => "Conventional",
            MillingType::Meander => "Meander",
        }
    }
}

/// Programmed spindle rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpindleDirection {
    Clockwise,
    CounterClockwise,
}

/// Direction and reversal policy for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementPolicy {
    pub milling: MillingType,
    pub spindle: SpindleDirection,
    /// Step-back pattern: doubles the hierarchy linking cutoff.
    pub parallel_step_back: bool,
}

impl MovementPolicy {
    /// True when open chunks may be entered from whichever end is closer.
    pub fn free_entry(&self) -> bool {
        self.milling == MillingType::Meander
    }

    /// Sign of the lead arc side: +1 keeps the arc on the climb side,
    /// -1 on the conventional side. Nested islands flip the sign.
    pub fn lead_side(&self, is_child: bool) -> f64 {
        let mut side = match (self.milling, self.spindle) {
            (MillingType::Conventional, SpindleDirection::Clockwise) => -1.0,
            (MillingType::Conventional, SpindleDirection::CounterClockwise) => 1.0,
            (_, SpindleDirection::Clockwise) => 1.0,
            (_, SpindleDirection::CounterClockwise) => -1.0,
        };
        if is_child {
            side = -side;
        }
        side
    }
}

impl Default for MovementPolicy {
    fn default() -> Self {
        Self {
            milling: MillingType::Climb,
            spindle: SpindleDirection::Clockwise,
            parallel_step_back: false,
        }
    }
}
