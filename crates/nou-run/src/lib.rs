//! NoU execution bridge: runs a compiled module and collects what it logs.
//!
//! ```text
//! artifact → Runner::load → Runner::run → run() ⇄ env.{log_int, log_str, get_int, get_str}
//!                                              ↓
//!                                          OutputLog → Runner::output
//! ```
//!
//! # Host capabilities
//!
//! Every import lives under module `env`. Each group is one [`Capability`]
//! holding only its own state:
//!
//! - [`LogCapability`]: `log_int(i32)`, `log_str(i64)`
//! - [`InputCapability`]: `get_int(i32) -> i32`, `get_str(i64) -> i64`
//!
//! Strings cross the boundary as packed slices (see [`nou_abi::Slice`])
//! pointing into the guest's `u_memory` export.

pub mod capability;
pub mod error;
pub mod input;
pub mod log;
pub mod runner;

pub use capability::{host_linker, Capability, HostState};
pub use error::{RunError, RunResult};
pub use input::{
    InputCapability, InputProvider, NoInput, ScriptedInput, PROMPT_NUMBER, PROMPT_TEXT,
};
pub use log::{LogCapability, OutputLog};
pub use runner::{Phase, Runner};
