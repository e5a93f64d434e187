//! Execution bridge error types.

use thiserror::Error;

use crate::runner::Phase;

/// Errors returned to the host. Faults inside the guest never surface here;
/// they end up in the output log instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// `load` or `run` called out of order.
    #[error("runner is {actual}, expected {expected}")]
    InvalidPhase { expected: Phase, actual: Phase },

    /// The artifact is not a valid WebAssembly module.
    #[error("invalid module: {0}")]
    InvalidModule(String),

    /// The module could not be instantiated against the host capabilities.
    #[error("instantiation failed: {0}")]
    Instantiation(String),
}

/// Execution bridge result type alias.
pub type RunResult<T> = Result<T, RunError>;
