//! How serious a diagnostic is. Elaboration of a class stops at its first
//! error; warnings are collected and reported alongside the result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic level. `Warning < Error`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Severity {
    /// Reported, but the element still elaborates.
    Warning,
    /// The element has no definition.
    Error,
}

impl Severity {
    /// Whether this level fails elaboration.
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// Lower-case label used in rendered headers.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// SGR colour code for terminal headers: red errors, yellow warnings.
    pub fn ansi_color(self) -> &'static str {
        match self {
            Severity::Warning => "33",
            Severity::Error => "31",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
