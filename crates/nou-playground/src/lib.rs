//! NoU playground: one "Run" of the browser playground, without the browser.
//!
//! ```text
//! source ─→ u -t ─→ tokens
//!        ─→ u -v ─→ visualization, compiler logs, a.out ─→ run() ─→ output
//! ```
//!
//! [`Session`] drives the passes, [`SessionReport`] carries the four text
//! sections and serializes to JSON for the `nou --json` command.

pub mod input;
pub mod logging;
pub mod session;

pub use input::{stdin_input, LineInput};
pub use logging::init_logging;
pub use session::{Session, SessionError, SessionOptions, SessionReport};
