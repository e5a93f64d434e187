//! Build driver error types.

use std::path::PathBuf;

use thiserror::Error;

/// Faults in the host environment around the compiler.
///
/// These are fatal: they describe a compiler image that can never run, not a
/// source program that failed to compile.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The image is not a valid WebAssembly module.
    #[error("invalid compiler image: {0}")]
    InvalidImage(String),

    /// The image has no `_start() -> ()` export.
    #[error("compiler image does not export a `_start` function")]
    MissingStart,

    /// The image has no `memory` export for WASI calls to use.
    #[error("compiler image does not export a linear `memory`")]
    MissingMemory,

    /// The image imports something outside WASI preview 1.
    #[error("cannot link compiler image: {0}")]
    Link(String),

    /// The image could not be read from disk.
    #[error("cannot read compiler image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to set up the sandbox for a single build.
///
/// The build is reported as failed; the compiler image itself stays usable.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("cannot prepare build directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot configure WASI context: {0}")]
    Wasi(String),
}

/// Build driver result type alias.
pub type BuildResult<T> = Result<T, BuildError>;
