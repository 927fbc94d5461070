use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::{self as ct, terminal};
use tracing_subscriber::EnvFilter;

use smallbasic_lib::core::{Program, RunMode};
use smallbasic_lib::vm::{Engine, RunOutcome};
use smallbasic_lib::{Compilation, CompilerOptions};

use std::io::{self, stdout};
use std::path::{Path, PathBuf};

mod debugger;
mod libraries;

use libraries::Host;

/// extension of the files written by --emit
const COMPILED_EXTENSION: &str = "sbc";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// a Small Basic source file, or a program written by --emit
    script: PathBuf,

    /// decides which library members a script may use
    #[arg(short, long, value_enum, default_value_t = Mode::Desktop)]
    mode: Mode,

    /// write the compiled program to this file instead of running it
    #[arg(short, long)]
    emit: Option<PathBuf>,

    /// run the script in the interactive debugger
    #[arg(short, long)]
    debug: bool,

    /// log what the compiler and the engine do to stderr
    #[arg(short, long)]
    verbose: bool,

    #[cfg(feature = "dev")]
    #[arg(short = 't', long)]
    show_tokens: bool,

    #[cfg(feature = "dev")]
    #[arg(short = 's', long)]
    show_syntax: bool,

    #[cfg(feature = "dev")]
    #[arg(short = 'i', long)]
    show_instructions: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Desktop,
    Constrained,
}

impl From<Mode> for RunMode {
    fn from(value: Mode) -> Self {
        match value {
            Mode::Desktop => RunMode::Desktop,
            Mode::Constrained => RunMode::Constrained,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let is_compiled = cli.script.extension().and_then(|e| e.to_str()) == Some(COMPILED_EXTENSION);
    let (program, src) = if is_compiled {
        let bytes = std::fs::read(&cli.script)
            .with_context(|| format!("Reading {}", cli.script.display()))?;
        (Program::from_bytes(&bytes)?, None)
    } else {
        let src = std::fs::read_to_string(&cli.script)
            .with_context(|| format!("Reading {}", cli.script.display()))?;
        let options = CompilerOptions::new(cli.mode.into(), libraries::manifest());
        let compilation = Compilation::new(&src, &options);

        #[cfg(feature = "dev")]
        if show_dev_output(&cli, &compilation) {
            return Ok(());
        }

        if !compilation.diagnostics().is_empty() {
            report_diagnostics(&cli.script, &compilation);
            std::process::exit(1);
        }
        let program = compilation
            .into_program()
            .context("There are no diagnostics, but also no program")?;
        (program, Some(src))
    };

    if let Some(path) = &cli.emit {
        std::fs::write(path, program.to_bytes()?)
            .with_context(|| format!("Writing {}", path.display()))?;
        return Ok(());
    }

    let (libraries, host) = libraries::libraries();
    let mut engine = Engine::new(program, libraries)?;
    if cli.debug {
        let mut stdout = stdout();
        ct::execute!(stdout, terminal::EnterAlternateScreen)?;
        let res = debugger::run(&mut engine, &host, src.as_deref(), &mut stdout);
        ct::execute!(stdout, terminal::LeaveAlternateScreen)?;
        res
    } else {
        run(&mut engine, &host)
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

pub fn run(engine: &mut Engine, host: &Host) -> Result<()> {
    loop {
        match engine.run()? {
            RunOutcome::Terminated => return Ok(()),
            RunOutcome::Paused => {}
            RunOutcome::Suspended(continuation) => {
                let value = host.complete(read_stdin_line)?;
                engine.resume(&continuation, Some(value))?;
            }
        }
    }
}

fn read_stdin_line() -> Result<Option<String>> {
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// `file:line:column: code: message`, with 1-based lines and columns
fn report_diagnostics(path: &Path, compilation: &Compilation) {
    for diagnostic in compilation.diagnostics().contents() {
        let start = diagnostic.range.start;
        eprintln!(
            "{}:{}:{}: {}: {}",
            path.display(),
            start.line + 1,
            start.column + 1,
            diagnostic.code,
            diagnostic.to_display_string()
        );
    }
}

#[cfg(feature = "dev")]
fn show_dev_output(cli: &Cli, compilation: &Compilation) -> bool {
    if cli.show_tokens {
        for token in compilation.tokens() {
            println!("{} {:?} {:?}", token.range, token.kind, token.text);
        }
        return true;
    }
    if cli.show_syntax {
        println!("{:#?}", compilation.syntax_tree());
        return true;
    }
    if cli.show_instructions {
        match compilation.program() {
            Some(program) => {
                for (i, instruction) in program.instructions.iter().enumerate() {
                    println!("{:>4}: {:<40} {}", i, format!("{:?}", instruction.code), instruction.range);
                }
            }
            None => println!("{:#?}", compilation.diagnostics()),
        }
        return true;
    }
    false
}
