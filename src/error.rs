//! The error type returned by this crate's top-level `check`/`run`
//! convenience functions.
//!
//! Kept as a plain `enum` with a manual `Display`/`std::error::Error`
//! impl rather than reaching for `thiserror` — the teacher's own
//! `TypeError`/`ParseError` pairs are written the same way, and there are
//! only three source stages to fan out over here.

use std::fmt::{self, Display};

use crate::diagnostics::Diagnostic;
use crate::evaluator::RuntimeError;
use crate::parser::ParseError;

/// The three ways a source program can fail to run, matching the
/// pipeline's three stages.
#[derive(Debug, Clone, PartialEq)]
pub enum UguisuError {
    Parse(ParseError),
    Analysis(Vec<Diagnostic>),
    Runtime(RuntimeError),
}

impl Display for UguisuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UguisuError::Parse(e) => write!(f, "parse error: {e}"),
            UguisuError::Analysis(diagnostics) => {
                write!(f, "analysis failed:")?;
                for d in diagnostics {
                    write!(f, "\n  {d}")?;
                }
                Ok(())
            }
            UguisuError::Runtime(e) => write!(f, "runtime error: {e}"),
        }
    }
}

impl std::error::Error for UguisuError {}

impl From<ParseError> for UguisuError {
    fn from(e: ParseError) -> Self {
        UguisuError::Parse(e)
    }
}

impl From<RuntimeError> for UguisuError {
    fn from(e: RuntimeError) -> Self {
        UguisuError::Runtime(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Pos;

    #[test]
    fn analysis_error_lists_every_diagnostic() {
        let err = UguisuError::Analysis(vec![
            Diagnostic::error("bad thing", Some(Pos::new(1, 1))),
            Diagnostic::error("other thing", None),
        ]);
        let rendered = err.to_string();
        assert!(rendered.contains("bad thing (1:1)"));
        assert!(rendered.contains("other thing"));
    }
}
