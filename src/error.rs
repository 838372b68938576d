use thiserror::Error;

/// Errors surfaced to the host. Anything not listed here (a missing
/// pickup/drop in a plan, an exhausted best-insertion search) is an
/// algorithmic invariant violation and panics instead, since no caller
/// action can recover from a bug in the solver itself.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("distance and duration matrices must be square and of equal size, got {distance}x{distance} vs {duration}x{duration}")]
    MatrixSizeMismatch { distance: usize, duration: usize },

    #[error("node index {0} is out of range for a {1}-node instance")]
    NodeOutOfRange(usize, usize),

    #[error("partial request for drop node {0} is missing a courier assignment")]
    PartialRequestMissingCourier(usize),

    #[error("courier {0} is out of range for {1} configured couriers")]
    CourierOutOfRange(usize, usize),

    #[error("capacity arrays must all have length {expected}, got {field} of length {actual}")]
    CapacityArityMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}
