//! The compiler process and its build loop.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wasmi::{Engine, ExternType, Linker, Module, Store};
use wasmi_wasi::{WasiCtx, WasiCtxBuilder};

use crate::error::{BuildError, BuildResult};
use crate::sandbox::Sandbox;

/// Program name and input file, in the order `u` expects them.
pub const BASE_ARGS: [&str; 2] = ["u", INPUT_FILE];

/// Source file the compiler reads, inside the preopened directory.
pub const INPUT_FILE: &str = "main.u";

/// Artifact file the compiler writes, inside the preopened directory.
pub const OUTPUT_FILE: &str = "a.out";

/// Print the token stream on stdout.
pub const FLAG_TOKENS: &str = "-t";

/// Print the syntax tree visualization on stdout.
pub const FLAG_VISUALIZE: &str = "-v";

const START_EXPORT: &str = "_start";
const MEMORY_EXPORT: &str = "memory";

/// How the last build ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    /// `_start` returned, or the process called `proc_exit(0)`.
    Completed,
    /// The process called `proc_exit` with a non-zero status.
    Exited(i32),
    /// The process trapped.
    Trapped(String),
    /// The sandbox for the build could not be set up or read back.
    SandboxFailed(String),
}

impl BuildStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Exited(code) => write!(f, "exited with status {code}"),
            Self::Trapped(message) => write!(f, "trapped: {message}"),
            Self::SandboxFailed(message) => write!(f, "sandbox failed: {message}"),
        }
    }
}

/// A loaded compiler image plus the buffers of its most recent build.
pub struct Compiler {
    engine: Engine,
    module: Module,
    linker: Linker<WasiCtx>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    args: Vec<String>,
    status: Option<BuildStatus>,
}

impl Compiler {
    /// Compile `image` and check that it can run as a WASI command.
    pub fn new(image: &[u8]) -> BuildResult<Self> {
        let engine = Engine::default();
        let module =
            Module::new(&engine, image).map_err(|e| BuildError::InvalidImage(e.to_string()))?;

        let mut has_start = false;
        let mut has_memory = false;
        for export in module.exports() {
            match (export.name(), export.ty()) {
                (START_EXPORT, ExternType::Func(ty)) => {
                    has_start = ty.params().is_empty() && ty.results().is_empty();
                }
                (MEMORY_EXPORT, ExternType::Memory(_)) => has_memory = true,
                _ => {}
            }
        }
        if !has_start {
            return Err(BuildError::MissingStart);
        }
        if !has_memory {
            return Err(BuildError::MissingMemory);
        }

        let mut linker = Linker::<WasiCtx>::new(&engine);
        wasmi_wasi::add_to_linker(&mut linker, |ctx| ctx)
            .map_err(|e| BuildError::Link(e.to_string()))?;

        // Unresolvable imports are a load error, not a failed build.
        let mut probe = Store::new(&engine, WasiCtxBuilder::new().build());
        let _ = linker
            .instantiate(&mut probe, &module)
            .map_err(|e| BuildError::Link(e.to_string()))?;

        debug!("compiler image loaded");
        Ok(Self {
            engine,
            module,
            linker,
            stdout: Vec::new(),
            stderr: Vec::new(),
            args: Vec::new(),
            status: None,
        })
    }

    /// Read the compiler image from `path`.
    pub fn from_file(path: impl AsRef<Path>) -> BuildResult<Self> {
        let path = path.as_ref();
        let image = std::fs::read(path).map_err(|source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(&image)
    }

    /// Compile `source`, passing `extra_args` after the base arguments.
    ///
    /// Returns the contents of `a.out` when the compiler finishes normally,
    /// and `None` when it traps or exits with a non-zero status. Either way
    /// [`output`](Self::output) and [`errors`](Self::errors) hold what the
    /// compiler printed.
    pub fn build(&mut self, source: &str, extra_args: &[&str]) -> Option<Vec<u8>> {
        self.args = BASE_ARGS
            .iter()
            .chain(extra_args)
            .map(|arg| arg.to_string())
            .collect();
        debug!(args = ?self.args, "starting build");
        self.stdout.clear();
        self.stderr.clear();

        let (status, artifact) = match Sandbox::new(source) {
            Ok(sandbox) => self.build_in(&sandbox),
            Err(err) => (BuildStatus::SandboxFailed(err.to_string()), None),
        };
        info!(
            stdout = self.stdout.len(),
            stderr = self.stderr.len(),
            %status,
            "build finished"
        );
        if artifact.is_none() {
            warn!(%status, "compiler did not produce an artifact");
        }
        self.status = Some(status);
        artifact
    }

    fn build_in(&mut self, sandbox: &Sandbox) -> (BuildStatus, Option<Vec<u8>>) {
        let ctx = match sandbox.context(&self.args) {
            Ok(ctx) => ctx,
            Err(err) => return (BuildStatus::SandboxFailed(err.to_string()), None),
        };
        let mut store = Store::new(&self.engine, ctx);
        let status = match self.start(&mut store) {
            Ok(()) => BuildStatus::Completed,
            Err(err) => match err.i32_exit_status() {
                Some(0) => BuildStatus::Completed,
                Some(code) => BuildStatus::Exited(code),
                None => BuildStatus::Trapped(err.to_string()),
            },
        };
        self.stdout = sandbox.stdout();
        self.stderr = sandbox.stderr();

        if !status.is_success() {
            return (status, None);
        }
        match sandbox.artifact() {
            Ok(artifact) => (status, Some(artifact)),
            Err(err) => (BuildStatus::SandboxFailed(err.to_string()), None),
        }
    }

    fn start(&self, store: &mut Store<WasiCtx>) -> Result<(), wasmi::Error> {
        let instance = self
            .linker
            .instantiate(&mut *store, &self.module)?
            .start(&mut *store)?;
        let start = instance.get_typed_func::<(), ()>(&*store, START_EXPORT)?;
        start.call(&mut *store, ())
    }

    /// Everything the compiler wrote to stdout during the last build.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Everything the compiler wrote to stderr during the last build.
    pub fn errors(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// How the last build ended, `None` before the first build.
    pub fn status(&self) -> Option<&BuildStatus> {
        self.status.as_ref()
    }

    /// Argument vector of the last build.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("args", &self.args)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
