//! Well-known names shared by the host and compiled NoU modules.

// ── Guest exports ────────────────────────────────────────────────────────────

/// Zero-argument entry point invoked by the execution bridge.
pub const ENTRY_POINT: &str = "run";
/// Linear memory exported by every compiled module.
pub const MEMORY_EXPORT: &str = "u_memory";

// ── Host imports ─────────────────────────────────────────────────────────────

/// Import module for all host capabilities.
pub const HOST_MODULE: &str = "env";
/// `env.log_int(value: i32)`
pub const LOG_INT: &str = "log_int";
/// `env.log_str(text: i64 slice)`
pub const LOG_STR: &str = "log_str";
/// `env.get_int(default: i32) -> i32`
pub const GET_INT: &str = "get_int";
/// `env.get_str(buffer: i64 slice) -> i64 slice`
pub const GET_STR: &str = "get_str";

/// Every import name the host provides under [`HOST_MODULE`].
pub const HOST_IMPORTS: [&str; 4] = [LOG_INT, LOG_STR, GET_INT, GET_STR];

// ── Diagnostics ──────────────────────────────────────────────────────────────

/// Prefix marking host diagnostics in a program's output.
pub const ERROR_PREFIX: &str = "ERROR: ";
/// Line logged when a module has no usable entry point.
pub const MISSING_ENTRY_POINT: &str = "ERROR: missing 'run := fn;'";
