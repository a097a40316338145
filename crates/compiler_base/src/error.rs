//! Error and diagnostic types with source location tracking.
//!
//! [`SpannedError`] is a plain byte-offset-anchored error for small, local
//! fallible operations (e.g. "can this slice be parsed as this literal").
//! [`Diagnostic`] is the richer `(range, severity, message)` triple the
//! front-end reports through a [`DiagnosticSink`] — the parser never aborts
//! on it, it just keeps going and hands the host a trail of diagnostics.
//!
//! # Example
//!
//! ```
//! use compiler_base::{SpannedError, Span, Result};
//!
//! fn parse_number(s: &str) -> Result<i32> {
//!     s.parse().map_err(|_| SpannedError::new(
//!         format!("invalid number: '{}'", s),
//!         Span::new(0, s.len()),
//!     ))
//! }
//!
//! let err = parse_number("abc").unwrap_err();
//! assert!(err.to_string().contains("invalid number"));
//! ```

use crate::span::{Span, SourceRange};
use std::fmt;

/// An error annotated with its source location.
///
/// Implements [`std::error::Error`] and [`fmt::Display`]. The display format is:
/// `{message} at {start}..{end}`.
#[derive(Debug, Clone)]
pub struct SpannedError {
    /// Human-readable error description.
    pub message: String,
    /// Location in source where the error occurred.
    pub span: Span,
}

impl SpannedError {
    /// Creates an error with the given message and source location.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for SpannedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for SpannedError {}

/// Alias for `std::result::Result<T, SpannedError>`.
///
/// Use this as the return type for fallible operations that are local and
/// don't need to keep going after failure.
pub type Result<T> = std::result::Result<T, SpannedError>;

/// The severity of a [`Diagnostic`].
///
/// There is no "fatal" severity: a fatal condition (out of memory, a
/// lexical error) is modeled by halting the scanner, not by a distinct
/// severity value — see the scanner's `halt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Err,
    Warn,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Err => "error",
            Severity::Warn => "warning",
        })
    }
}

/// A `(range, severity, message)` triple reported by the front-end.
///
/// Diagnostics never abort parsing; they accumulate in whatever
/// [`DiagnosticSink`] the host supplied.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub range: SourceRange,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(range: SourceRange, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            range,
            severity,
            message: message.into(),
        }
    }

    pub fn error(range: SourceRange, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Err, message)
    }

    pub fn warning(range: SourceRange, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Warn, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.range.focus.input, self.range.focus.line, self.range.focus.col,
            self.severity, self.message
        )
    }
}

/// The host-supplied collector for diagnostics.
///
/// The parser makes no assumption about how diagnostics are surfaced —
/// printed, collected for a test, forwarded to an IDE — only that `report`
/// can be called freely and cheaply. Implementations are responsible for
/// any deduplication policy they want; the front-end does not coalesce.
pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);
}

/// A `Vec`-backed [`DiagnosticSink`] useful for tests and embedding.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    inner: std::sync::Mutex<Vec<Diagnostic>>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all diagnostics reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Returns `true` if any diagnostic at [`Severity::Err`] was reported.
    pub fn has_errors(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|d| d.severity == Severity::Err)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for DiagnosticBag {
    fn report(&self, diagnostic: Diagnostic) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::intern;
    use crate::span::SourceLocation;

    #[test]
    fn spanned_error_display() {
        let err = SpannedError::new("test error", Span::new(5, 10));
        let display = format!("{}", err);
        assert!(display.contains("test error"));
        assert!(display.contains("5..10"));
    }

    fn loc(line: u32, col: u32) -> SourceRange {
        SourceRange::point(SourceLocation::new(intern("t.lang"), line, col))
    }

    #[test]
    fn diagnostic_bag_collects_in_order() {
        let bag = DiagnosticBag::new();
        bag.report(Diagnostic::error(loc(1, 1), "first"));
        bag.report(Diagnostic::warning(loc(2, 1), "second"));
        let diags = bag.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "first");
        assert_eq!(diags[1].severity, Severity::Warn);
    }

    #[test]
    fn diagnostic_bag_has_errors_only_when_err_present() {
        let bag = DiagnosticBag::new();
        assert!(!bag.has_errors());
        bag.report(Diagnostic::warning(loc(1, 1), "just a warning"));
        assert!(!bag.has_errors());
        bag.report(Diagnostic::error(loc(1, 1), "now an error"));
        assert!(bag.has_errors());
    }

    #[test]
    fn diagnostic_display_includes_location_and_severity() {
        let d = Diagnostic::error(loc(4, 9), "unexpected token");
        let s = d.to_string();
        assert!(s.contains("4:9"));
        assert!(s.contains("error"));
        assert!(s.contains("unexpected token"));
    }
}
