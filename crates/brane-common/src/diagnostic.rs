//! Diagnostic reporting.
//!
//! A thin layer over codespan-reporting: build a diagnostic from a message
//! and a labeled span, then render it against the `SourceMap`.

use crate::source::{FileId, SourceMap};
use crate::span::Span;
use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label};
use codespan_reporting::term::{self, termcolor::{ColorChoice, StandardStream}};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    fn to_codespan(self) -> codespan_reporting::diagnostic::Severity {
        match self {
            Severity::Error => codespan_reporting::diagnostic::Severity::Error,
            Severity::Warning => codespan_reporting::diagnostic::Severity::Warning,
            Severity::Note => codespan_reporting::diagnostic::Severity::Note,
        }
    }
}

/// A diagnostic with an optional primary label.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    label: Option<(FileId, Span, String)>,
    notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            label: None,
            notes: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_label(mut self, file: FileId, span: Span, message: impl Into<String>) -> Self {
        self.label = Some((file, span, message.into()));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn into_codespan(self) -> CsDiagnostic<FileId> {
        let mut diag =
            CsDiagnostic::new(self.severity.to_codespan()).with_message(self.message);
        if let Some((file, span, message)) = self.label {
            diag = diag.with_labels(vec![
                Label::primary(file, span.to_range()).with_message(message)
            ]);
        }
        if !self.notes.is_empty() {
            diag = diag.with_notes(self.notes);
        }
        diag
    }
}

/// Render diagnostics to stderr with source snippets.
pub fn emit(sources: &SourceMap, diagnostics: impl IntoIterator<Item = Diagnostic>) {
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = term::Config::default();
    for diag in diagnostics {
        let _ = term::emit(
            &mut writer.lock(),
            &config,
            sources.files(),
            &diag.into_codespan(),
        );
    }
}
