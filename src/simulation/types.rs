//! Core types for the traffic controller
//!
//! Handles and constants shared by directions, intersections and the controller.

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for direction IDs
///
/// Directions link to each other through these handles rather than references,
/// so the ring never forms an ownership cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectionId(pub SimId);

/// Fixed time charged for switching the lights over to the next direction
pub const SWITCH_OVER_COST: f64 = 2.0;

/// Default share of a direction's total waiting time drained per served cycle
pub const DEFAULT_CYCLE_SIZE: f64 = 0.5;

/// Default time for one vehicle to clear the intersection once released
pub const DEFAULT_PASS_DURATION: f64 = 1.0;

/// Smallest ring an intersection may be reduced to
pub const MIN_DIRECTIONS: usize = 2;
