//! Diagnostic rendering for the command line
//!
//! `Diagnostic` only carries a byte span, not a resolved line/column or
//! source snippet, so this module resolves those against the original
//! source text before printing a "header, location, snippet, notes" block
//! with `termcolor`.

use relay_runtime::diagnostic::{Diagnostic, DiagnosticLevel};
use std::path::Path;
use termcolor::{Color, ColorSpec, StandardStream, WriteColor};

/// Render every diagnostic in `diags` to `stream`, in order.
pub fn emit_all(stream: &mut StandardStream, path: &Path, source: &str, diags: &[Diagnostic]) {
    for diag in diags {
        let _ = emit(stream, path, source, diag);
    }
}

fn emit(stream: &mut StandardStream, path: &Path, source: &str, diag: &Diagnostic) -> std::io::Result<()> {
    let (line, col) = line_col(source, diag.span.start);
    let color = match diag.level {
        DiagnosticLevel::Error => Color::Red,
        DiagnosticLevel::Warning => Color::Yellow,
    };

    stream.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(stream, "{}[{}]", diag.level, diag.code)?;
    stream.reset()?;
    writeln!(stream, ": {}", diag.message)?;

    stream.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    write!(stream, "  --> ")?;
    stream.reset()?;
    writeln!(stream, "{}:{}:{}", path.display(), line, col)?;

    if let Some(text) = source_line(source, line) {
        let gutter = line.to_string().len() + 1;
        stream.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        writeln!(stream, "{:>width$}|", "", width = gutter)?;
        write!(stream, "{:>width$}| ", line, width = gutter)?;
        stream.reset()?;
        writeln!(stream, "{text}")?;

        stream.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        write!(stream, "{:>width$}| ", "", width = gutter)?;
        stream.reset()?;
        let caret_len = (diag.span.end.saturating_sub(diag.span.start)).max(1);
        stream.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        writeln!(stream, "{}{}", " ".repeat(col.saturating_sub(1)), "^".repeat(caret_len))?;
        stream.reset()?;
    }

    for note in &diag.notes {
        stream.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        write!(stream, "   = ")?;
        stream.reset()?;
        writeln!(stream, "note: {note}")?;
    }

    writeln!(stream)
}

/// 1-based (line, column) of a byte offset into `source`.
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn source_line(source: &str, line: usize) -> Option<&str> {
    source.lines().nth(line - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_line_and_column_after_newlines() {
        let src = "ab\ncd\nef";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 4), (2, 2));
        assert_eq!(line_col(src, 7), (3, 2));
    }

    #[test]
    fn source_line_is_one_indexed() {
        let src = "first\nsecond\nthird";
        assert_eq!(source_line(src, 2), Some("second"));
        assert_eq!(source_line(src, 1), Some("first"));
    }
}
