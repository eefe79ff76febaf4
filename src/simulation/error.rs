//! Error types for the traffic controller core

use super::types::DirectionId;

/// Failures raised by directions, intersections and the controller
///
/// Every operation validates its input before mutating anything, so an `Err`
/// always leaves the receiver exactly as it was.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// The ring would stop being circular, or would shrink below two directions
    #[error("structural invariant violated: {0}")]
    StructuralInvariant(String),
    /// A negative, non-finite or out-of-range value was supplied
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The handle does not refer to any direction held by this intersection
    #[error("direction {0:?} is not part of this intersection")]
    UnknownDirection(DirectionId),
}

pub type SimResult<T> = Result<T, SimError>;

/// Reject negative, NaN and infinite quantities
pub(crate) fn ensure_non_negative(value: f64, what: &str) -> SimResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidArgument(format!(
            "{what} must be a finite, non-negative number, got {value}"
        )))
    }
}
