//! The playground flow: tokens pass, visualization pass, run.

use std::fmt;
use std::path::Path;

use nou_build::{BuildError, BuildStatus, Compiler, FLAG_TOKENS, FLAG_VISUALIZE};
use nou_run::{InputProvider, Phase, RunError, Runner};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Which compiler passes a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Run a `-t` pass and report the token stream.
    pub tokens: bool,
    /// Build with `-v` and report the visualization.
    pub visualize: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tokens: true,
            visualize: true,
        }
    }
}

/// Host faults that stop a session. A program that fails to compile or
/// traps is not one of them; see [`SessionReport`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("cannot run artifact: {0}")]
    Run(#[from] RunError),
}

/// Everything one session produced, section by section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Compiler stdout of the `-t` pass.
    pub tokens: Option<String>,
    /// Compiler stdout of the `-v` pass.
    pub visualization: Option<String>,
    /// Compiler stderr of the artifact-producing pass.
    pub errors: String,
    /// How the artifact-producing pass ended.
    pub build: BuildStatus,
    /// How the run ended; `None` when there was nothing to run.
    pub phase: Option<Phase>,
    /// What the program logged; empty when the build failed.
    pub output: String,
}

impl SessionReport {
    /// Whether the compiler produced an artifact.
    pub fn built(&self) -> bool {
        self.build.is_success()
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [
            ("tokens", self.tokens.as_deref()),
            ("visualization", self.visualization.as_deref()),
            ("compiler logs", Some(self.errors.as_str())),
            ("output", Some(self.output.as_str())),
        ];
        for (title, body) in sections {
            let Some(body) = body else { continue };
            writeln!(f, "── {title} ──")?;
            f.write_str(body)?;
            if !body.is_empty() && !body.ends_with('\n') {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// A compiler plus the passes to run on each source.
#[derive(Debug)]
pub struct Session {
    compiler: Compiler,
    options: SessionOptions,
}

impl Session {
    pub fn new(compiler: Compiler, options: SessionOptions) -> Self {
        Self { compiler, options }
    }

    /// Load the compiler image from `path`.
    pub fn from_file(
        path: impl AsRef<Path>,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        Ok(Self::new(Compiler::from_file(path)?, options))
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Compile `source` and, if that produced an artifact, run it with
    /// `provider` answering its questions.
    pub fn run(
        &mut self,
        source: &str,
        provider: impl InputProvider + 'static,
    ) -> Result<SessionReport, SessionError> {
        let tokens = if self.options.tokens {
            self.compiler.build(source, &[FLAG_TOKENS]);
            Some(self.compiler.output())
        } else {
            None
        };

        let (artifact, visualization) = if self.options.visualize {
            let artifact = self.compiler.build(source, &[FLAG_VISUALIZE]);
            (artifact, Some(self.compiler.output()))
        } else {
            (self.compiler.build(source, &[]), None)
        };
        let errors = self.compiler.errors();
        let build = self
            .compiler
            .status()
            .cloned()
            .unwrap_or(BuildStatus::Completed);

        let (phase, output) = match artifact {
            Some(artifact) => {
                debug!(bytes = artifact.len(), "running artifact");
                let mut runner = Runner::new(provider);
                runner.load(&artifact)?;
                let phase = runner.run()?;
                (Some(phase), runner.output())
            }
            None => (None, String::new()),
        };
        info!(%build, ?phase, "session finished");

        Ok(SessionReport {
            tokens,
            visualization,
            errors,
            build,
            phase,
            output,
        })
    }
}
