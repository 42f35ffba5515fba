//! Diagnostic codes with category prefixes for structured error identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
///
/// Categories follow the error taxonomy of the elaborator: malformed
/// definitions, unresolvable connections, generator contract violations,
/// errors reported back by the external solver, and internal defects.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Malformed block, port, or link definitions, prefixed with `D`.
    Definition,
    /// Unresolved or ambiguous connections, prefixed with `N`.
    Connectivity,
    /// Generator protocol violations, prefixed with `G`.
    Generator,
    /// Errors returned by the external solver, prefixed with `S`.
    Solver,
    /// Internal consistency defects, prefixed with `I`.
    Internal,
    /// Non-fatal findings, prefixed with `W`.
    Warning,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Definition => 'D',
            Category::Connectivity => 'N',
            Category::Generator => 'G',
            Category::Solver => 'S',
            Category::Internal => 'I',
            Category::Warning => 'W',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a number.
///
/// Displayed as the prefix followed by a zero-padded 3-digit number, e.g. `D301`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
