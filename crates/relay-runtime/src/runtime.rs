//! Front-to-back orchestration: source text in, exit status out.
//!
//! Wires the four compiler passes (scanner, analyzer, type annotator,
//! emitter) to the lexer/parser ahead of them and the [`vm`](crate::vm)
//! behind them.

use crate::ast::Program;
use crate::bytecode::FunctionTable;
use crate::diagnostic::Diagnostic;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::scanner;
use crate::symbol::StringPool;
use crate::types::TypeTable;
use crate::value::RuntimeError;
use crate::vm::{Output, RuntimeContext, StdoutOutput, Thread};
use crate::{analyzer, compiler, typechecker};
use std::sync::Arc;

/// Tunable limits for a single run, with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Total bytes available to the bump-allocated heap arena.
    pub heap_size: u64,
    /// Call-stack depth, in frames, for the main goroutine (and every
    /// goroutine spawned via `go`).
    pub call_stack_size: usize,
    /// Operand-stack depth, in words, for the main goroutine (and every
    /// spawned goroutine).
    pub operand_stack_size: usize,
    /// Name of the function the program starts running from.
    pub main_function_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heap_size: 64 * 1024 * 1024,
            call_stack_size: 8 * 1024,
            operand_stack_size: 1024,
            main_function_name: "main".to_string(),
        }
    }
}

/// Everything that can go wrong between source text and a running program.
#[derive(Debug)]
pub enum ProgramError {
    Diagnostics(Vec<Diagnostic>),
    Runtime(RuntimeError),
    MissingMain(String),
}

impl std::fmt::Display for ProgramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramError::Diagnostics(diags) => {
                for d in diags {
                    writeln!(f, "{d}")?;
                }
                Ok(())
            }
            ProgramError::Runtime(e) => write!(f, "{e}"),
            ProgramError::MissingMain(name) => write!(f, "no function named `{name}`"),
        }
    }
}

impl std::error::Error for ProgramError {}

/// Parse and typecheck `src`, returning the compiled [`FunctionTable`] and
/// the program's string/type tables, without running anything. Used by
/// tooling that only wants to validate a program (`relay check`).
pub fn compile(src: &str, config: &Config) -> Result<(FunctionTable, TypeTable, StringPool), ProgramError> {
    let program = parse(src)?;
    let scan = scanner::scan(&program);
    let frames = analyzer::analyze(&scan, &program);
    let mut annotation = typechecker::TypeChecker::new(&scan, &frames)
        .check(&program)
        .map_err(|d| ProgramError::Diagnostics(vec![d]))?;

    if !scan.by_name.contains_key(&config.main_function_name) {
        return Err(ProgramError::MissingMain(config.main_function_name.clone()));
    }

    let mut strings = StringPool::new();
    let functions = compiler::Compiler::new(&scan, &frames, &annotation, &mut strings).compile();
    let types = std::mem::take(&mut annotation.table);
    Ok((functions, types, strings))
}

fn parse(src: &str) -> Result<Program, ProgramError> {
    let tokens = Lexer::new(src)
        .tokenize()
        .map_err(|d| ProgramError::Diagnostics(vec![d]))?;
    Parser::new(tokens)
        .parse_program()
        .map_err(|d| ProgramError::Diagnostics(vec![d]))
}

/// Compile `src` and run it to completion on the current thread, printing
/// through the real process stdout, blocking until the main goroutine
/// returns and every goroutine it spawned has finished.
pub fn run(src: &str, config: &Config) -> Result<(), ProgramError> {
    run_with_output(src, config, Arc::new(StdoutOutput))
}

/// As [`run`], but printing through a caller-supplied [`Output`] sink
/// instead of stdout — used by tests that assert on a program's output
/// in-process rather than capturing a subprocess.
pub fn run_with_output(src: &str, config: &Config, output: Arc<dyn Output>) -> Result<(), ProgramError> {
    let (functions, types, strings) = compile(src, config)?;
    let scan_main = functions
        .iter()
        .find(|f| f.name.as_deref() == Some(config.main_function_name.as_str()))
        .map(|f| f.index)
        .ok_or_else(|| ProgramError::MissingMain(config.main_function_name.clone()))?;

    let ctx = Arc::new(RuntimeContext::with_output(
        functions,
        types,
        strings,
        config.heap_size,
        output,
    ));
    let mut main_thread = Thread::new(ctx.clone(), config.operand_stack_size, config.call_stack_size);
    let result = main_thread.run(scan_main, Vec::new());
    ctx.goroutines.wait_until_empty();
    result.map_err(ProgramError::Runtime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_trivial_program() {
        let src = "func main() { var x int = 1 }";
        let config = Config::default();
        let result = compile(src, &config);
        assert!(result.is_ok());
    }

    #[test]
    fn missing_main_is_reported() {
        let src = "func helper() { }";
        let config = Config::default();
        let err = compile(src, &config).unwrap_err();
        assert!(matches!(err, ProgramError::MissingMain(_)));
    }

    #[test]
    fn runs_a_program_that_prints() {
        let src = r#"func main() { iprint(41+1) }"#;
        let result = run(src, &Config::default());
        assert!(result.is_ok());
    }
}
