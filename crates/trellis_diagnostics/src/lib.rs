//! Structured diagnostics for elaboration and compilation failures.
//!
//! A [`Diagnostic`] carries a severity, a category-prefixed [`DiagnosticCode`],
//! the class or path it is attributed to, and optional notes and remediation
//! hints. The [`DiagnosticSink`] accumulates diagnostics across a session and
//! the [`TerminalRenderer`] formats them for humans.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
