//! Source positions and the diagnostic messages produced by every stage of
//! the pipeline.

use std::fmt::{self, Display};

/// A 1-based `(line, column)` position of the first character of a token
/// or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warn,
    Error,
}

/// A single diagnostic message, optionally anchored to a source position.
///
/// `to_string` produces the stable `"<message> (<line>:<column>)"` /
/// `"<message>"` format committed to in the external interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub position: Option<Pos>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, position: impl Into<Option<Pos>>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            position: position.into(),
        }
    }

    pub fn warn(message: impl Into<String>, position: impl Into<Option<Pos>>) -> Self {
        Self {
            severity: Severity::Warn,
            message: message.into(),
            position: position.into(),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} ({})", self.message, pos),
            None => write!(f, "{}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_position() {
        let d = Diagnostic::error("bad thing", Some(Pos::new(3, 7)));
        assert_eq!(d.to_string(), "bad thing (3:7)");
    }

    #[test]
    fn formats_without_position() {
        let d = Diagnostic::error("bad thing", None);
        assert_eq!(d.to_string(), "bad thing");
    }
}
