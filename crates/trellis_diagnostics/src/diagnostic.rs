//! Structured diagnostic messages with severity, codes, subjects, and hints.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A structured diagnostic message.
///
/// The subject names what the diagnostic is attributed to: usually a block,
/// port or link class name, or a dotted design path for solver errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The unique code identifying the kind of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// The class or path this diagnostic is attributed to.
    pub subject: Option<String>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
    /// Remediation hints.
    pub help: Vec<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, code: DiagnosticCode, message: String) -> Self {
        Self {
            severity,
            code,
            message,
            subject: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates a new error diagnostic with the given code and message.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message.into())
    }

    /// Creates a new warning diagnostic with the given code and message.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message.into())
    }

    /// Attributes this diagnostic to a class or path.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: ", self.severity, self.code)?;
        if let Some(subject) = &self.subject {
            write!(f, "in {subject}: ")?;
        }
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    #[test]
    fn create_error() {
        let code = DiagnosticCode::new(Category::Definition, 301);
        let diag = Diagnostic::error(code, "duplicate name `sink`");
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code.to_string(), "D301");
        assert!(diag.subject.is_none());
    }

    #[test]
    fn builder_methods() {
        let code = DiagnosticCode::new(Category::Generator, 320);
        let diag = Diagnostic::error(code, "Generator missing generate implementation")
            .with_subject("TestGenerator")
            .with_note("the block is not abstract")
            .with_help("define generate");
        assert_eq!(diag.subject.as_deref(), Some("TestGenerator"));
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help, vec!["define generate".to_string()]);
    }

    #[test]
    fn display_includes_subject() {
        let code = DiagnosticCode::new(Category::Connectivity, 310);
        let diag = Diagnostic::error(code, "no bridge for port").with_subject("TopBlock");
        assert_eq!(diag.to_string(), "error[N310]: in TopBlock: no bridge for port");
    }
}
