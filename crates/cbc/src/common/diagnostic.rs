//! Diagnostics: collection, error ceiling and rendering

use super::{CompileError, CompileResult, Position};
use codespan_reporting::diagnostic::{Diagnostic as Report, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;

/// Default error ceiling
pub const DEFAULT_MAX_ERRORS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Secondary message attached to a diagnostic
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub message: String,
    pub position: Option<Position>,
}

/// A single user-facing error or warning
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub position: Position,
    pub notes: Vec<Note>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, position: Position) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            position,
            notes: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>, position: Position) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            position,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, message: impl Into<String>, position: Position) -> Self {
        self.notes.push(Note {
            message: message.into(),
            position: Some(position),
        });
        self
    }

    pub fn with_plain_note(mut self, message: impl Into<String>) -> Self {
        self.notes.push(Note {
            message: message.into(),
            position: None,
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        write!(f, "({}) {}: {}", self.position, label, self.message)?;
        for note in &self.notes {
            match &note.position {
                Some(pos) => write!(f, "\n    Note: {} ({})", note.message, pos)?,
                None => write!(f, "\n    Note: {}", note.message)?,
            }
        }
        Ok(())
    }
}

/// How diagnostics are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticStyle {
    /// One `(In file, line L, position P) Error: ...` line per diagnostic
    #[default]
    Plain,
    /// codespan-reporting output with source snippets
    Pretty,
}

/// Collects every diagnostic of a session and enforces the error ceiling
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    file_ids: HashMap<String, usize>,
    writer: StandardStream,
    config: term::Config,
    style: DiagnosticStyle,
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    max_errors: usize,
    logging_enabled: bool,
    limit_reached: bool,
}

impl DiagnosticReporter {
    pub fn new(max_errors: usize, logging_enabled: bool, style: DiagnosticStyle) -> Self {
        Self {
            files: SimpleFiles::new(),
            file_ids: HashMap::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
            style,
            diagnostics: Vec::new(),
            error_count: 0,
            warning_count: 0,
            max_errors: max_errors.max(1),
            logging_enabled,
            limit_reached: false,
        }
    }

    /// Register source text so pretty output can show snippets
    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        let name = name.into();
        let id = self.files.add(name.clone(), source.into());
        self.file_ids.insert(name, id);
        id
    }

    /// Record a diagnostic. Fails with `ErrorLimit` once the ceiling is hit.
    pub fn report(&mut self, diagnostic: Diagnostic) -> CompileResult<()> {
        if self.limit_reached {
            return Err(CompileError::ErrorLimit {
                max: self.max_errors,
            });
        }

        match diagnostic.severity {
            Severity::Warning => self.warning_count += 1,
            Severity::Error => self.error_count += 1,
        }
        self.emit(&diagnostic);
        self.diagnostics.push(diagnostic);

        if self.error_count >= self.max_errors {
            self.limit_reached = true;
            let limit = Diagnostic::error(
                format!(
                    "Error count reached the maximum of {}. Terminating compilation.",
                    self.max_errors
                ),
                self.diagnostics
                    .last()
                    .map(|d| d.position.clone())
                    .unwrap_or_default(),
            );
            self.emit(&limit);
            self.diagnostics.push(limit);
            return Err(CompileError::ErrorLimit {
                max: self.max_errors,
            });
        }
        Ok(())
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Messages of all recorded errors, in report order
    pub fn error_messages(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.message.as_str())
            .collect()
    }

    /// Every diagnostic in the plain line format
    pub fn render_plain(&self) -> String {
        let mut out = String::new();
        for diagnostic in &self.diagnostics {
            out.push_str(&diagnostic.to_string());
            out.push('\n');
        }
        out
    }

    fn emit(&self, diagnostic: &Diagnostic) {
        if !self.logging_enabled {
            return;
        }
        if self.style == DiagnosticStyle::Pretty {
            if let Some(report) = self.to_report(diagnostic) {
                let _ = term::emit(&mut self.writer.lock(), &self.config, &self.files, &report);
                return;
            }
        }
        let _ = writeln!(self.writer.lock(), "{}", diagnostic);
    }

    /// Pretty form; `None` when the primary position has no registered source
    fn to_report(&self, diagnostic: &Diagnostic) -> Option<Report<usize>> {
        let file_id = *self.file_ids.get(&*diagnostic.position.file)?;
        let span = diagnostic.position.span;

        let mut labels = vec![Label::primary(file_id, span.start..span.end)];
        let mut notes = Vec::new();
        for note in &diagnostic.notes {
            let secondary = note.position.as_ref().and_then(|pos| {
                self.file_ids
                    .get(&*pos.file)
                    .map(|id| Label::secondary(*id, pos.span.start..pos.span.end))
            });
            match secondary {
                Some(label) => labels.push(label.with_message(note.message.clone())),
                None => notes.push(note.message.clone()),
            }
        }

        let report = match diagnostic.severity {
            Severity::Error => Report::error(),
            Severity::Warning => Report::warning(),
        };
        Some(
            report
                .with_message(diagnostic.message.clone())
                .with_labels(labels)
                .with_notes(notes),
        )
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ERRORS, true, DiagnosticStyle::Plain)
    }
}

impl fmt::Debug for DiagnosticReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticReporter")
            .field("style", &self.style)
            .field("error_count", &self.error_count)
            .field("warning_count", &self.warning_count)
            .field("max_errors", &self.max_errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn quiet(max: usize) -> DiagnosticReporter {
        DiagnosticReporter::new(max, false, DiagnosticStyle::Plain)
    }

    #[test]
    fn test_plain_format_with_notes() {
        let diag = Diagnostic::error(
            "Multiple declarations of identifier \"x\"",
            Position::new("a.cb", 4, 1),
        )
        .with_note("Previously declared here", Position::new("a.cb", 2, 1))
        .with_plain_note("Expected \";\" after each assignment.");

        assert_eq!(
            diag.to_string(),
            "(In a.cb, line 4, position 1) Error: Multiple declarations of identifier \"x\"\n    \
             Note: Previously declared here (In a.cb, line 2, position 1)\n    \
             Note: Expected \";\" after each assignment."
        );
    }

    #[test]
    fn test_warning_label() {
        let diag = Diagnostic::warning("Additional ';' found", Position::new("a.cb", 1, 3));
        assert_eq!(diag.to_string(), "(In a.cb, line 1, position 3) Warning: Additional ';' found");
    }

    #[test]
    fn test_counts_errors_and_warnings() {
        let mut reporter = quiet(10);
        reporter.report(Diagnostic::warning("w", Position::default())).unwrap();
        reporter.report(Diagnostic::error("e1", Position::default())).unwrap();
        reporter.report(Diagnostic::error("e2", Position::default())).unwrap();

        assert_eq!(reporter.error_count(), 2);
        assert_eq!(reporter.warning_count(), 1);
        assert_eq!(reporter.error_messages(), vec!["e1", "e2"]);
    }

    #[test]
    fn test_error_ceiling() {
        let mut reporter = quiet(2);
        assert!(reporter.report(Diagnostic::error("first", Position::default())).is_ok());
        let second = reporter.report(Diagnostic::error("second", Position::default()));
        assert!(matches!(second, Err(CompileError::ErrorLimit { max: 2 })));
        assert!(reporter.limit_reached());

        // Nothing else is recorded after the ceiling
        let third = reporter.report(Diagnostic::error("third", Position::default()));
        assert!(matches!(third, Err(CompileError::ErrorLimit { .. })));
        assert_eq!(reporter.error_count(), 2);
        assert!(reporter
            .render_plain()
            .contains("Error count reached the maximum of 2. Terminating compilation."));
    }
}
