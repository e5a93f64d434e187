//! The logging capability and the output it collects.

use nou_abi::names::{HOST_MODULE, LOG_INT, LOG_STR};
use nou_abi::{read_utf8, Slice};
use wasmi::errors::LinkerError;
use wasmi::{Caller, Error, Linker};

use crate::capability::{guest_memory, host_trap, Capability, HostState};

/// Lines logged by one run, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputLog {
    lines: Vec<String>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines joined by `\n`, plus a trailing `\n`. An empty log renders as
    /// a single `\n`.
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// `log_int` / `log_str`: append to the [`OutputLog`].
#[derive(Debug, Default)]
pub struct LogCapability {
    log: OutputLog,
}

impl LogCapability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &OutputLog {
        &self.log
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.log.push(line);
    }
}

impl Capability for LogCapability {
    const IMPORTS: &'static [&'static str] = &[LOG_INT, LOG_STR];

    fn add_to_linker(linker: &mut Linker<HostState>) -> Result<(), LinkerError> {
        linker.func_wrap(
            HOST_MODULE,
            LOG_INT,
            |mut caller: Caller<'_, HostState>, value: i32| {
                caller.data_mut().log.push(value.to_string());
            },
        )?;
        linker.func_wrap(
            HOST_MODULE,
            LOG_STR,
            |mut caller: Caller<'_, HostState>, raw: i64| -> Result<(), Error> {
                let memory = guest_memory(&caller)?;
                let (bytes, state) = memory.data_and_store_mut(&mut caller);
                let text = read_utf8(bytes, Slice::from_wasm(raw)).map_err(host_trap)?;
                state.log.push(text);
                Ok(())
            },
        )?;
        Ok(())
    }

    fn reset(&mut self) {
        self.log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_renders_single_newline() {
        assert_eq!(OutputLog::new().render(), "\n");
    }

    #[test]
    fn lines_are_joined_with_trailing_newline() {
        let mut log = OutputLog::new();
        log.push("3");
        log.push("hello");
        assert_eq!(log.render(), "3\nhello\n");
    }

    #[test]
    fn reset_clears_lines() {
        let mut cap = LogCapability::new();
        cap.push("old");
        cap.reset();
        assert!(cap.log().is_empty());
    }
}
