//! `nou`: compile a NoU program with `u.wasm` and run it.
//!
//! Exit status: 0 when the program ran, 1 when it did not compile, 2 on a
//! host error (unreadable files, broken compiler image, bad artifact).

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use nou_playground::{init_logging, stdin_input, Session, SessionOptions, SessionReport};
use nou_run::{InputProvider, NoInput, ScriptedInput};
use tracing::warn;

/// `SOURCE` value that reads the program from stdin.
const STDIN_SOURCE: &str = "-";

#[derive(Parser, Debug)]
#[command(name = "nou")]
#[command(about = "Compile and run a NoU program", long_about = None)]
struct Cli {
    /// Source file, or `-` to read it from stdin
    source: PathBuf,

    /// Path to the compiler image
    #[arg(long, env = "NOU_COMPILER", default_value = "u.wasm")]
    compiler: PathBuf,

    /// Show the token stream (default)
    #[arg(long, overrides_with = "no_tokens")]
    tokens: bool,

    /// Hide the token stream
    #[arg(long, overrides_with = "tokens")]
    no_tokens: bool,

    /// Show the syntax tree visualization (default)
    #[arg(long, overrides_with = "no_visualize")]
    visualize: bool,

    /// Hide the syntax tree visualization
    #[arg(long, overrides_with = "visualize")]
    no_visualize: bool,

    /// Answer the program's questions from this list instead of stdin
    #[arg(long = "input", value_name = "ANSWER")]
    inputs: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log build and run details to stderr
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn options(&self) -> SessionOptions {
        SessionOptions {
            tokens: self.tokens || !self.no_tokens,
            visualize: self.visualize || !self.no_visualize,
        }
    }

    /// Where the program's questions are answered.
    ///
    /// Stdin serves the answers unless the source was read from it.
    fn input(&self) -> Box<dyn InputProvider> {
        if !self.inputs.is_empty() {
            Box::new(ScriptedInput::new(self.inputs.clone()))
        } else if reads_stdin(&self.source) {
            warn!("source was read from stdin, so questions keep their defaults; use --input");
            Box::new(NoInput)
        } else {
            Box::new(stdin_input())
        }
    }
}

fn main() -> ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("nou: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let source = read_source(&cli.source)?;
    let mut session = Session::from_file(&cli.compiler, cli.options())
        .with_context(|| format!("loading compiler {}", cli.compiler.display()))?;

    let report = session.run(&source, cli.input()).context("running session")?;

    print_report(&report, cli.json)?;
    Ok(if report.built() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn reads_stdin(path: &Path) -> bool {
    path.as_os_str() == STDIN_SOURCE
}

fn read_source(path: &Path) -> Result<String> {
    if reads_stdin(path) {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("reading source from stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn print_report(report: &SessionReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("nou").chain(args.iter().copied()))
    }

    #[test]
    fn stdin_source_without_answers_keeps_defaults() {
        let mut input = cli(&["-"]).input();
        assert_eq!(input.ask("NoU asks for a number", "5"), None);
    }

    #[test]
    fn scripted_answers_win_over_stdin() {
        let mut input = cli(&["--input", "12", "-"]).input();
        assert_eq!(input.ask("NoU asks for a number", "5"), Some("12".to_string()));
        assert_eq!(input.ask("NoU asks for a number", "5"), None);
    }

    #[test]
    fn only_dash_reads_stdin() {
        assert!(reads_stdin(Path::new("-")));
        assert!(!reads_stdin(Path::new("main.u")));
        assert!(!reads_stdin(Path::new("./-")));
    }

    #[test]
    fn both_sections_on_by_default() {
        let options = cli(&["main.u"]).options();
        assert!(options.tokens && options.visualize);
        let options = cli(&["--no-tokens", "main.u"]).options();
        assert!(!options.tokens && options.visualize);
    }
}
