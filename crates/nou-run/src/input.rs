//! The interactive input capability and the providers behind it.

use std::collections::VecDeque;
use std::fmt;

use nou_abi::names::{GET_INT, GET_STR, HOST_MODULE};
use nou_abi::{read_bytes, truncate_utf8, write_bytes, Slice};
use tracing::debug;
use wasmi::errors::LinkerError;
use wasmi::{Caller, Error, Linker};

use crate::capability::{guest_memory, host_trap, Capability, HostState};

/// Prompt shown for `get_int`.
pub const PROMPT_NUMBER: &str = "NoU asks for a number";
/// Prompt shown for `get_str`.
pub const PROMPT_TEXT: &str = "NoU asks for text";

/// Something that answers a guest's questions.
///
/// Calls block the guest until they return.
pub trait InputProvider {
    /// Answer `prompt`; `default` is what the program proposes. `None` means
    /// no answer, and the guest keeps its default.
    fn ask(&mut self, prompt: &str, default: &str) -> Option<String>;
}

impl<P: InputProvider + ?Sized> InputProvider for Box<P> {
    fn ask(&mut self, prompt: &str, default: &str) -> Option<String> {
        (**self).ask(prompt, default)
    }
}

/// Never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputProvider for NoInput {
    fn ask(&mut self, _prompt: &str, _default: &str) -> Option<String> {
        None
    }
}

/// Answers from a fixed queue, first in first out. Declines once empty.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl InputProvider for ScriptedInput {
    fn ask(&mut self, _prompt: &str, _default: &str) -> Option<String> {
        self.answers.pop_front()
    }
}

/// `get_int` / `get_str`: forward questions to an [`InputProvider`].
pub struct InputCapability {
    provider: Box<dyn InputProvider>,
    asked: usize,
}

impl InputCapability {
    pub fn new(provider: Box<dyn InputProvider>) -> Self {
        Self { provider, asked: 0 }
    }

    /// Questions asked during the current run.
    pub fn asked(&self) -> usize {
        self.asked
    }

    /// Ask for a number. Unparseable or missing answers yield `default`.
    pub fn get_int(&mut self, default: i32) -> i32 {
        self.asked += 1;
        let answer = self.provider.ask(PROMPT_NUMBER, &default.to_string());
        debug!(?answer, default, "get_int");
        answer
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Ask for text to place in `buffer`, whose current contents (up to the
    /// first trailing NUL) are the default. The answer is cut at a character
    /// boundary so it fits; the returned slice covers the bytes written.
    pub fn get_str(
        &mut self,
        memory: &mut [u8],
        buffer: Slice,
    ) -> Result<Slice, nou_abi::SliceError> {
        self.asked += 1;
        let current = read_bytes(memory, buffer)?;
        let default = String::from_utf8_lossy(current);
        let default = default.trim_end_matches('\0');
        let answer = self
            .provider
            .ask(PROMPT_TEXT, default)
            .unwrap_or_else(|| default.to_string());
        let fitted = truncate_utf8(&answer, buffer.length as usize);
        debug!(answer = fitted, capacity = buffer.length, "get_str");
        write_bytes(memory, buffer.pointer, fitted.as_bytes())
    }
}

impl fmt::Debug for InputCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputCapability")
            .field("asked", &self.asked)
            .finish_non_exhaustive()
    }
}

impl Capability for InputCapability {
    const IMPORTS: &'static [&'static str] = &[GET_INT, GET_STR];

    fn add_to_linker(linker: &mut Linker<HostState>) -> Result<(), LinkerError> {
        linker.func_wrap(
            HOST_MODULE,
            GET_INT,
            |mut caller: Caller<'_, HostState>, default: i32| -> i32 {
                caller.data_mut().input.get_int(default)
            },
        )?;
        linker.func_wrap(
            HOST_MODULE,
            GET_STR,
            |mut caller: Caller<'_, HostState>, raw: i64| -> Result<i64, Error> {
                let memory = guest_memory(&caller)?;
                let (bytes, state) = memory.data_and_store_mut(&mut caller);
                let written = state
                    .input
                    .get_str(bytes, Slice::from_wasm(raw))
                    .map_err(host_trap)?;
                Ok(written.to_wasm())
            },
        )?;
        Ok(())
    }

    fn reset(&mut self) {
        self.asked = 0;
    }
}
