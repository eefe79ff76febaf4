//! Traffic light controller core
//!
//! A ring of directions, each holding a queue of waiting vehicles, served
//! round-robin by a controller. Everything here is independent of the command
//! line and can be driven directly from tests.

mod controller;
mod direction;
mod error;
mod intersection;
mod stats;
mod types;

pub use controller::{Controller, ControllerState, CycleReport, SharedController};
pub use direction::Direction;
pub use error::{SimError, SimResult};
pub use intersection::{DirectionArena, Intersection, RingIter};
pub use stats::SimulationStats;
pub use types::{
    DirectionId, SimId, DEFAULT_CYCLE_SIZE, DEFAULT_PASS_DURATION, MIN_DIRECTIONS,
    SWITCH_OVER_COST,
};
