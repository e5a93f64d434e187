//! NoU host/guest ABI.
//!
//! Everything the host and a compiled NoU module have to agree on bit for
//! bit lives here:
//!
//! ## Slices
//! A slice is a `(length, pointer)` pair addressing guest linear memory,
//! passed across the call boundary as a single `i64`:
//!
//! ```text
//! bits 63..32 : length (u32)
//! bits 31..0  : pointer (u32)
//! ```
//!
//! ## Names
//! - `env.log_int(i32)`, `env.log_str(i64)`
//! - `env.get_int(i32) -> i32`, `env.get_str(i64) -> i64`
//! - export `run() -> ()`, export `u_memory`

pub mod error;
pub mod names;
pub mod slice;

pub use error::{SliceError, SliceResult};
pub use slice::{decode, encode, read_bytes, read_utf8, truncate_utf8, write_bytes, Slice};
