//! Unified diagnostic type
//!
//! Every stage of the pipeline (lexer, parser, variable analyzer, type
//! annotator, emitter) reports failures as a `Diagnostic`. Runtime-fatal
//! errors are a separate, smaller type (`value::RuntimeError`) since they
//! abort an already-running goroutine rather than a compilation pass.

use crate::span::Span;
use std::fmt;

/// Stable error codes, one per semantic error kind, plus a handful for the
/// lexer and parser.
pub mod error_codes {
    pub const LEX_UNEXPECTED_CHAR: &str = "RL0001";
    pub const LEX_MALFORMED_NUMBER: &str = "RL0002";
    pub const LEX_UNTERMINATED_STRING: &str = "RL0003";
    pub const PARSE_UNEXPECTED_TOKEN: &str = "RL0010";
    pub const PARSE_UNEXPECTED_EOF: &str = "RL0011";
    pub const NAME_ERROR: &str = "RL0020";
    pub const TYPE_ERROR: &str = "RL0021";
    pub const SHAPE_ERROR: &str = "RL0022";
    pub const VAR_DECL_MULTI_NAME: &str = "RL0023";
}

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A single compile-time diagnostic: level, stable code, message and span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: &'static str,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Construct an error-level diagnostic with a stable error code
    pub fn error_with_code(code: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            code,
            message: message.into(),
            span,
            notes: Vec::new(),
        }
    }

    /// Attach a note to this diagnostic
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} (at {}..{})",
            self.level, self.code, self.message, self.span.start, self.span.end
        )?;
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_code_and_span() {
        let d = Diagnostic::error_with_code(error_codes::TYPE_ERROR, "bad types", Span::new(1, 4));
        let rendered = d.to_string();
        assert!(rendered.contains("RL0021"));
        assert!(rendered.contains("bad types"));
    }
}
