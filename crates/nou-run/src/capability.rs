//! The host side of the `env` import module.

use nou_abi::names::MEMORY_EXPORT;
use nou_abi::SliceError;
use wasmi::errors::LinkerError;
use wasmi::{Caller, Engine, Error, Extern, Linker, Memory};

use crate::input::{InputCapability, InputProvider};
use crate::log::LogCapability;

/// A group of host imports together with the state they act on.
pub trait Capability {
    /// Import names defined under `env`.
    const IMPORTS: &'static [&'static str];

    /// Define this capability's imports on `linker`.
    fn add_to_linker(linker: &mut Linker<HostState>) -> Result<(), LinkerError>;

    /// Drop per-run state before the entry point is called.
    fn reset(&mut self) {}
}

/// Store data for a running guest: one field per capability.
#[derive(Debug)]
pub struct HostState {
    pub(crate) log: LogCapability,
    pub(crate) input: InputCapability,
}

impl HostState {
    pub fn new(provider: Box<dyn InputProvider>) -> Self {
        Self {
            log: LogCapability::new(),
            input: InputCapability::new(provider),
        }
    }

    pub fn log(&self) -> &LogCapability {
        &self.log
    }

    pub fn input(&self) -> &InputCapability {
        &self.input
    }

    pub(crate) fn reset(&mut self) {
        self.log.reset();
        self.input.reset();
    }
}

/// A linker with every host capability defined.
pub fn host_linker(engine: &Engine) -> Result<Linker<HostState>, LinkerError> {
    let mut linker = Linker::new(engine);
    LogCapability::add_to_linker(&mut linker)?;
    InputCapability::add_to_linker(&mut linker)?;
    Ok(linker)
}

/// The guest's `u_memory` export.
pub(crate) fn guest_memory(caller: &Caller<'_, HostState>) -> Result<Memory, Error> {
    caller
        .get_export(MEMORY_EXPORT)
        .and_then(Extern::into_memory)
        .ok_or_else(|| host_trap(SliceError::MissingMemory(MEMORY_EXPORT)))
}

/// Turn a bad slice into a trap that unwinds the guest.
pub(crate) fn host_trap(err: SliceError) -> Error {
    Error::new(err.to_string())
}
