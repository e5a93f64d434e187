//! Line-based answers for `get_int` / `get_str`.

use std::io::{self, BufRead, Write};

use nou_run::InputProvider;

/// Asks on `prompt_out`, answers with one line from `answers`.
///
/// An empty line or end of input keeps the program's default.
#[derive(Debug)]
pub struct LineInput<R, W> {
    answers: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> LineInput<R, W> {
    pub fn new(answers: R, prompt_out: W) -> Self {
        Self {
            answers,
            prompt_out,
        }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.answers, self.prompt_out)
    }
}

impl<R: BufRead, W: Write> InputProvider for LineInput<R, W> {
    fn ask(&mut self, prompt: &str, default: &str) -> Option<String> {
        // Prompt write failures are ignored.
        let _ = write!(self.prompt_out, "{prompt} [{default}]: ");
        let _ = self.prompt_out.flush();

        let mut line = String::new();
        match self.answers.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let answer = line.trim_end_matches(['\n', '\r']);
                (!answer.is_empty()).then(|| answer.to_string())
            }
        }
    }
}

/// Prompts on stderr, reads answers from stdin.
pub fn stdin_input() -> LineInput<io::StdinLock<'static>, io::Stderr> {
    LineInput::new(io::stdin().lock(), io::stderr())
}
