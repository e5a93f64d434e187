//! The WASI environment for one build.
//!
//! Each build gets its own scratch directory, preopened as `.` and holding
//! only `main.u` and an empty `a.out`, plus in-memory standard streams. The
//! directory is removed when the sandbox is dropped.

use std::fs;
use std::io;
use std::sync::{Arc, RwLock};

use tempfile::TempDir;
use tracing::trace;
use wasmi_wasi::wasi_common::pipe::{ReadPipe, WritePipe};
use wasmi_wasi::{ambient_authority, Dir, WasiCtx, WasiCtxBuilder};

use crate::compiler::{INPUT_FILE, OUTPUT_FILE};
use crate::error::SandboxError;

/// Guest path of the preopened scratch directory.
pub const PREOPEN_DIR: &str = ".";

type SharedBuffer = Arc<RwLock<Vec<u8>>>;

pub(crate) struct Sandbox {
    dir: TempDir,
    stdout: SharedBuffer,
    stderr: SharedBuffer,
}

impl Sandbox {
    /// Create the scratch directory with `source` as the input file.
    pub fn new(source: &str) -> Result<Self, SandboxError> {
        let dir = tempfile::Builder::new().prefix("nou-build-").tempdir()?;
        fs::write(dir.path().join(INPUT_FILE), source)?;
        fs::write(dir.path().join(OUTPUT_FILE), b"")?;
        trace!(dir = %dir.path().display(), "sandbox ready");
        Ok(Self {
            dir,
            stdout: SharedBuffer::default(),
            stderr: SharedBuffer::default(),
        })
    }

    /// A WASI context bound to this sandbox, with `args` as argv.
    ///
    /// Stdin is empty and the environment has no variables.
    pub fn context(&self, args: &[String]) -> Result<WasiCtx, SandboxError> {
        let preopen = Dir::open_ambient_dir(self.dir.path(), ambient_authority())?;
        let mut builder = WasiCtxBuilder::new();
        builder
            .args(args)
            .map_err(|e| SandboxError::Wasi(e.to_string()))?
            .stdin(Box::new(ReadPipe::from(Vec::new())))
            .stdout(Box::new(WritePipe::from_shared(self.stdout.clone())))
            .stderr(Box::new(WritePipe::from_shared(self.stderr.clone())))
            .preopened_dir(preopen, PREOPEN_DIR)
            .map_err(|e| SandboxError::Wasi(e.to_string()))?;
        Ok(builder.build())
    }

    pub fn stdout(&self) -> Vec<u8> {
        snapshot(&self.stdout)
    }

    pub fn stderr(&self) -> Vec<u8> {
        snapshot(&self.stderr)
    }

    /// Contents of `a.out`; empty if the compiler removed it.
    pub fn artifact(&self) -> io::Result<Vec<u8>> {
        match fs::read(self.dir.path().join(OUTPUT_FILE)) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            result => result,
        }
    }
}

fn snapshot(buffer: &SharedBuffer) -> Vec<u8> {
    match buffer.read() {
        Ok(bytes) => bytes.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}
