//! Loading and running one artifact.

use std::fmt;

use nou_abi::names::{ENTRY_POINT, ERROR_PREFIX, MISSING_ENTRY_POINT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wasmi::{Engine, Instance, Module, Store};

use crate::capability::{host_linker, HostState};
use crate::error::{RunError, RunResult};
use crate::input::InputProvider;
use crate::log::OutputLog;

/// Lifecycle of a [`Runner`].
///
/// ```text
/// Unloaded --load--> Instantiated --run--> Ran | Faulted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Unloaded,
    Instantiated,
    /// The entry point returned, or was missing.
    Ran,
    /// The entry point trapped.
    Faulted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::Instantiated => "instantiated",
            Self::Ran => "ran",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Runs a single artifact once.
pub struct Runner {
    engine: Engine,
    store: Store<HostState>,
    instance: Option<Instance>,
    phase: Phase,
}

impl Runner {
    pub fn new(provider: impl InputProvider + 'static) -> Self {
        let engine = Engine::default();
        let store = Store::new(&engine, HostState::new(Box::new(provider)));
        Self {
            engine,
            store,
            instance: None,
            phase: Phase::Unloaded,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Parse `artifact` and instantiate it against the host capabilities.
    pub fn load(&mut self, artifact: &[u8]) -> RunResult<()> {
        self.require(Phase::Unloaded)?;
        let module = Module::new(&self.engine, artifact)
            .map_err(|e| RunError::InvalidModule(e.to_string()))?;
        let linker =
            host_linker(&self.engine).map_err(|e| RunError::Instantiation(e.to_string()))?;
        let instance = linker
            .instantiate(&mut self.store, &module)
            .and_then(|pre| pre.start(&mut self.store))
            .map_err(|e| RunError::Instantiation(e.to_string()))?;
        self.instance = Some(instance);
        self.set_phase(Phase::Instantiated);
        Ok(())
    }

    /// Call the entry point.
    ///
    /// A missing entry point or a trap is reported in the output log; the
    /// returned phase tells which way the run ended.
    pub fn run(&mut self) -> RunResult<Phase> {
        self.require(Phase::Instantiated)?;
        let instance = self.instance.ok_or(RunError::InvalidPhase {
            expected: Phase::Instantiated,
            actual: Phase::Unloaded,
        })?;
        self.store.data_mut().reset();

        let entry = instance.get_typed_func::<(), ()>(&self.store, ENTRY_POINT);
        let phase = match entry {
            Err(err) => {
                debug!(%err, "no usable entry point");
                self.store.data_mut().log.push(MISSING_ENTRY_POINT);
                Phase::Ran
            }
            Ok(func) => match func.call(&mut self.store, ()) {
                Ok(()) => Phase::Ran,
                Err(err) => {
                    warn!(%err, "guest trapped");
                    self.store
                        .data_mut()
                        .log
                        .push(format!("{ERROR_PREFIX}{err}"));
                    Phase::Faulted
                }
            },
        };
        self.set_phase(phase);
        Ok(phase)
    }

    /// What the guest logged, rendered for display.
    pub fn output(&self) -> String {
        self.log().render()
    }

    pub fn log(&self) -> &OutputLog {
        self.store.data().log().log()
    }

    fn require(&self, expected: Phase) -> RunResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(RunError::InvalidPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "runner phase");
        self.phase = phase;
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("phase", &self.phase)
            .field("state", self.store.data())
            .finish_non_exhaustive()
    }
}
