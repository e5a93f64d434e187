//! NoU build driver: runs the `u` compiler as a sandboxed WASI process.
//!
//! ```text
//! source → main.u ─┐
//! argv  ──────────┼→ u.wasm::_start() ─→ a.out (artifact) + stdout + stderr
//! ```
//!
//! The compiler image is parsed once by [`Compiler::new`]. Every
//! [`Compiler::build`] instantiates it again inside a fresh sandbox: a scratch
//! directory preopened as `.`, in-memory stdout/stderr, and the WASI preview 1
//! host calls from `wasmi_wasi`.

pub mod compiler;
pub mod error;
mod sandbox;

pub use compiler::{
    BuildStatus, Compiler, BASE_ARGS, FLAG_TOKENS, FLAG_VISUALIZE, INPUT_FILE, OUTPUT_FILE,
};
pub use error::{BuildError, BuildResult, SandboxError};
pub use sandbox::PREOPEN_DIR;
