//! Test fixtures assembled with `wasm-encoder`.
//!
//! The real `u` compiler is an external binary, so tests drive the host with
//! small stand-ins:
//!
//! - [`WasiProcess`]: a WASI command whose `_start` runs a scripted list of
//!   steps (write to a stream, echo a file, write `a.out`, exit, trap, …).
//! - [`GuestProgram`]: a module shaped like `u`'s output, importing the `env`
//!   capabilities, exporting `u_memory` and a `run` entry point.

mod guest;
mod process;

pub use guest::{module_importing, GuestProgram};
pub use process::{WasiProcess, Whence};
pub use wasm_encoder::ValType;

use wasm_encoder::MemArg;

fn memarg(offset: u64, align: u32) -> MemArg {
    MemArg {
        offset,
        align,
        memory_index: 0,
    }
}
