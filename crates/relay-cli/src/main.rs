//! `relay` — compile and run a Relay source file.
//!
//! Parses args, reads the source file, runs the full pipeline (scanner →
//! analyzer → typechecker → compiler → vm), and reports the result:
//! program output goes straight to stdout as the native print functions
//! produce it, compile diagnostics and fatal runtime errors go to stderr.

mod diagnostics;

use clap::{Parser, ValueEnum};
use relay_runtime::runtime::{self, Config, ProgramError};
use std::path::PathBuf;
use std::process::ExitCode;
use termcolor::{ColorChoice, StandardStream};

#[derive(Parser)]
#[command(name = "relay", version, about = "Compiler and runtime for the Relay language")]
struct Cli {
    /// Path to a `.relay` source file
    file: PathBuf,

    /// Heap size in bytes for the bump allocator (default: 64 MiB)
    #[arg(long)]
    heap_size: Option<u64>,

    /// Operand/call stack depth, in frames, for every goroutine (default: 8192)
    #[arg(long)]
    stack_size: Option<usize>,

    /// When to use color in diagnostic output
    #[arg(long, value_enum, default_value = "auto")]
    color: Color,
}

#[derive(Clone, Copy, ValueEnum)]
enum Color {
    Always,
    Never,
    Auto,
}

impl From<Color> for ColorChoice {
    fn from(c: Color) -> Self {
        // Always respect NO_COLOR (https://no-color.org).
        if std::env::var_os("NO_COLOR").is_some() {
            return ColorChoice::Never;
        }
        match c {
            Color::Always => ColorChoice::Always,
            Color::Never => ColorChoice::Never,
            Color::Auto => ColorChoice::Auto,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: couldn't read {}: {e}", cli.file.display());
            return ExitCode::FAILURE;
        }
    };

    let mut config = Config::default();
    if let Some(heap_size) = cli.heap_size {
        config.heap_size = heap_size;
    }
    if let Some(stack_size) = cli.stack_size {
        config.call_stack_size = stack_size;
        config.operand_stack_size = stack_size;
    }

    match runtime::run(&source, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&cli.file, &source, err, cli.color.into());
            ExitCode::FAILURE
        }
    }
}

fn report(path: &std::path::Path, source: &str, err: ProgramError, color: ColorChoice) {
    let mut stderr = StandardStream::stderr(color);
    match err {
        ProgramError::Diagnostics(diags) => diagnostics::emit_all(&mut stderr, path, source, &diags),
        ProgramError::Runtime(e) => eprintln!("runtime error: {e}"),
        ProgramError::MissingMain(name) => eprintln!("error: no function named `{name}`"),
    }
}
