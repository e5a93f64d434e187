//! Slice access error types.

use thiserror::Error;

/// Errors raised when a slice is turned into a guest-memory access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SliceError {
    /// `pointer + length` lies past the end of guest memory.
    #[error("slice out of bounds: pointer={pointer}, length={length}, memory size={memory_size}")]
    OutOfBounds {
        pointer: u32,
        length: u32,
        memory_size: usize,
    },

    /// The guest does not export the memory a slice refers to.
    #[error("guest memory export `{0}` not found")]
    MissingMemory(&'static str),
}

/// Slice result type alias.
pub type SliceResult<T> = Result<T, SliceError>;
