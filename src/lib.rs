//! `uguisu`: a small statically-typed imperative language's scanner,
//! parser, analyzer and tree-walking evaluator, exposed as a library so
//! the CLI binary is a thin shell around it.

pub mod analyzer;
pub mod ast;
pub mod builtins;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod scanner;
pub mod scope;
pub mod symbol;
pub mod types;

pub use error::UguisuError;

use evaluator::{HostOptions, Value};

/// Parses and analyzes `source`, returning the collected diagnostics
/// either way. Does not run the program.
pub fn check(source: &str, filename: &str) -> Result<analyzer::AnalysisOutcome, UguisuError> {
    let file = parser::parse(source, filename)?;
    Ok(analyzer::analyze(&file))
}

/// Parses, analyzes, and — if analysis succeeds — runs `source`.
/// Analysis failures are reported as [`UguisuError::Analysis`] rather
/// than handed to the evaluator, which assumes a statically valid
/// program.
pub fn run(source: &str, filename: &str, options: &HostOptions) -> Result<Value, UguisuError> {
    let file = parser::parse(source, filename)?;
    let outcome = analyzer::analyze(&file);
    if !outcome.success {
        return Err(UguisuError::Analysis(outcome.errors));
    }
    Ok(evaluator::run(&file, options)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_reports_analysis_errors_without_running() {
        let outcome = check("fn main(){ break; }", "t.ug").unwrap();
        assert!(!outcome.success);
    }

    #[test]
    fn run_rejects_a_program_that_fails_analysis() {
        let result = run("fn main(){ break; }", "t.ug", &HostOptions::silent());
        assert!(matches!(result, Err(UguisuError::Analysis(_))));
    }

    #[test]
    fn run_executes_a_valid_program() {
        let result = run("fn main(){ assertEq(1+1, 2); }", "t.ug", &HostOptions::silent());
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn run_surfaces_a_parse_error() {
        let result = run("fn main( {", "t.ug", &HostOptions::silent());
        assert!(matches!(result, Err(UguisuError::Parse(_))));
    }
}
