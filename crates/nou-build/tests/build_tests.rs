//! Build driver tests.
//!
//! The real `u` compiler is not part of the tree; each test loads a small
//! WASI command assembled by `nou-testkit` that behaves like one facet of it
//! (print diagnostics, copy `main.u` somewhere, write `a.out`, exit, trap).

use nou_build::{BuildError, BuildStatus, Compiler, FLAG_TOKENS, FLAG_VISUALIZE, OUTPUT_FILE};
use nou_testkit::{WasiProcess, Whence};

const ARTIFACT: &[u8] = b"\0asm\x01\0\0\0";

fn compiler(process: WasiProcess) -> Compiler {
    Compiler::new(&process.build()).expect("fixture should load")
}

// ══════════════════════════════════════════════════════════════════════════════
// Loading
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_invalid_image_is_rejected() {
    let err = Compiler::new(b"definitely not wasm").unwrap_err();
    assert!(matches!(err, BuildError::InvalidImage(_)), "got {err:?}");
}

#[test]
fn test_image_without_start_is_rejected() {
    let wasm = WasiProcess::new().stdout("x").without_start().build();
    let err = Compiler::new(&wasm).unwrap_err();
    assert!(matches!(err, BuildError::MissingStart), "got {err:?}");
}

#[test]
fn test_missing_image_file_is_io_error() {
    let err = Compiler::from_file("/nonexistent/u.wasm").unwrap_err();
    assert!(matches!(err, BuildError::Io { .. }), "got {err:?}");
    assert!(err.to_string().contains("/nonexistent/u.wasm"));
}

#[test]
fn test_status_is_empty_before_first_build() {
    let c = compiler(WasiProcess::new());
    assert_eq!(c.status(), None);
    assert_eq!(c.output(), "");
    assert_eq!(c.errors(), "");
}

// ══════════════════════════════════════════════════════════════════════════════
// Successful builds
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_successful_build_returns_artifact() {
    let mut c = compiler(
        WasiProcess::new()
            .stderr("INFO: Writing to a.out\n")
            .write_file(OUTPUT_FILE, ARTIFACT),
    );
    let artifact = c.build("run := fn { log_int(1 + 2); };", &[]);
    assert_eq!(artifact.as_deref(), Some(ARTIFACT));
    assert_eq!(c.status(), Some(&BuildStatus::Completed));
    assert_eq!(c.errors(), "INFO: Writing to a.out\n");
}

#[test]
fn test_empty_artifact_is_still_success() {
    let mut c = compiler(WasiProcess::new().stdout("nothing to emit"));
    assert_eq!(c.build("", &[]), Some(Vec::new()));
}

#[test]
fn test_proc_exit_zero_is_success() {
    let mut c = compiler(WasiProcess::new().write_file(OUTPUT_FILE, ARTIFACT).exit(0));
    assert_eq!(c.build("x", &[]).as_deref(), Some(ARTIFACT));
    assert_eq!(c.status(), Some(&BuildStatus::Completed));
}

#[test]
fn test_compiler_reads_source_from_input_file() {
    let mut c = compiler(WasiProcess::new().echo_file("main.u", 1));
    c.build("log_int(42);", &[]);
    assert_eq!(c.output(), "log_int(42);");
}

#[test]
fn test_argument_vector_is_base_then_extra() {
    let mut c = compiler(WasiProcess::new().echo_args());
    c.build("", &[FLAG_TOKENS]);
    assert_eq!(c.args(), ["u", "main.u", "-t"]);
    assert_eq!(c.output(), "u\0main.u\0-t\0");

    c.build("", &[FLAG_VISUALIZE, "--extra"]);
    assert_eq!(c.output(), "u\0main.u\0-v\0--extra\0");

    c.build("", &[]);
    assert_eq!(c.output(), "u\0main.u\0");
}

#[test]
fn test_paths_outside_preopen_are_refused() {
    let mut c = compiler(WasiProcess::new().write_file("/tmp/a.out", b"x").stdout("ok"));
    assert_eq!(c.build("", &[]), None);
    assert_eq!(c.status(), Some(&BuildStatus::Exited(2)));
    assert_eq!(c.errors(), "cannot open /tmp/a.out\n");
    assert_eq!(c.output(), "");
}

#[test]
fn test_only_source_and_output_are_visible() {
    let mut c = compiler(WasiProcess::new().echo_file("Cargo.toml", 1));
    assert_eq!(c.build("", &[]), None);
    assert_eq!(c.status(), Some(&BuildStatus::Exited(2)));
    assert_eq!(c.errors(), "cannot open Cargo.toml\n");
}

#[test]
fn test_write_at_huge_offset_is_refused_inside_guest() {
    for whence in [Whence::Set, Whence::End] {
        let mut c = compiler(
            WasiProcess::new()
                .write_file_at(OUTPUT_FILE, whence, i64::MAX, b"x")
                .stdout("done"),
        );
        assert_eq!(c.build("", &[]), Some(Vec::new()), "whence {whence:?}");
        assert_eq!(c.status(), Some(&BuildStatus::Completed));
        assert_eq!(c.output(), "done");
    }
}

#[test]
fn test_write_at_negative_offset_is_refused_inside_guest() {
    let mut c = compiler(WasiProcess::new().write_file_at(OUTPUT_FILE, Whence::Set, -1, b"x"));
    assert_eq!(c.build("", &[]), Some(Vec::new()));
    assert_eq!(c.status(), Some(&BuildStatus::Completed));
}

#[test]
fn test_write_at_offset_extends_artifact() {
    let mut c = compiler(WasiProcess::new().write_file_at(OUTPUT_FILE, Whence::Set, 3, b"x"));
    assert_eq!(c.build("", &[]).as_deref(), Some(&b"\0\0\0x"[..]));
}

// ══════════════════════════════════════════════════════════════════════════════
// Failed builds
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_trap_returns_none_and_keeps_diagnostics() {
    let mut c = compiler(
        WasiProcess::new()
            .stdout("partial tokens")
            .stderr("ERROR: unexpected token\n")
            .trap(),
    );
    assert_eq!(c.build("let", &[FLAG_TOKENS]), None);
    assert!(matches!(c.status(), Some(BuildStatus::Trapped(_))));
    assert_eq!(c.output(), "partial tokens");
    assert_eq!(c.errors(), "ERROR: unexpected token\n");
}

#[test]
fn test_nonzero_exit_returns_none() {
    let mut c = compiler(
        WasiProcess::new()
            .write_file(OUTPUT_FILE, ARTIFACT)
            .stderr("ERROR: type mismatch\n")
            .exit(1),
    );
    assert_eq!(c.build("x", &[]), None);
    assert_eq!(c.status(), Some(&BuildStatus::Exited(1)));
    assert_eq!(c.errors(), "ERROR: type mismatch\n");
}

#[test]
fn test_syntax_error_depends_on_source() {
    let mut c = compiler(
        WasiProcess::new()
            .reject_if_first_byte("main.u", b'!', "ERROR: syntax\n", 1)
            .write_file(OUTPUT_FILE, ARTIFACT),
    );
    assert_eq!(c.build("!!", &[]), None);
    assert_eq!(c.errors(), "ERROR: syntax\n");

    assert_eq!(c.build("ok", &[]).as_deref(), Some(ARTIFACT));
    assert_eq!(c.errors(), "");
}

// ══════════════════════════════════════════════════════════════════════════════
// Isolation between builds
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_no_residue_between_builds() {
    let mut c = compiler(
        WasiProcess::new()
            .echo_file("main.u", 1)
            .echo_file("main.u", 2)
            .echo_file(OUTPUT_FILE, 1)
            .write_file(OUTPUT_FILE, b"X"),
    );

    c.build("a much longer first program", &[]);
    assert_eq!(c.output(), "a much longer first program");

    // A shorter second source must not keep the tail of the first, and the
    // previous artifact must not be visible to the second run.
    let artifact = c.build("short", &[]);
    assert_eq!(c.output(), "short");
    assert_eq!(c.errors(), "short");
    assert_eq!(artifact.as_deref(), Some(&b"X"[..]));
}

#[test]
fn test_failed_build_after_success_clears_streams() {
    let mut c = compiler(
        WasiProcess::new()
            .reject_if_first_byte("main.u", b'!', "bad\n", 3)
            .stdout("good\n"),
    );
    assert!(c.build("fine", &[]).is_some());
    assert_eq!(c.output(), "good\n");

    assert!(c.build("!", &[]).is_none());
    assert_eq!(c.output(), "");
    assert_eq!(c.errors(), "bad\n");
}

#[test]
fn test_status_serializes_as_snake_case() {
    let json = serde_json::to_string(&BuildStatus::Exited(2)).unwrap();
    assert_eq!(json, r#"{"exited":2}"#);
    let json = serde_json::to_string(&BuildStatus::Completed).unwrap();
    assert_eq!(json, r#""completed""#);
    let json = serde_json::to_string(&BuildStatus::SandboxFailed("disk".into())).unwrap();
    assert_eq!(json, r#"{"sandbox_failed":"disk"}"#);
}
