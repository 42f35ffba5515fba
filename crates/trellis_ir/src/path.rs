//! Structural paths addressing elements relative to a containing block.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved path steps for introspection pseudo-parameters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Reserved {
    /// The link a port is connected to.
    ConnectedLink,
    /// Whether a port is connected.
    IsConnected,
    /// The number of elements of a port array.
    Length,
    /// The names of the requested elements of a port array.
    Allocated,
    /// The name of a block or port.
    Name,
}

impl Reserved {
    fn display_name(self) -> &'static str {
        match self {
            Reserved::ConnectedLink => "(link)",
            Reserved::IsConnected => "(is_connected)",
            Reserved::Length => "(length)",
            Reserved::Allocated => "(allocated)",
            Reserved::Name => "(name)",
        }
    }
}

/// One step of a [`LocalPath`].
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum LocalStep {
    /// A plain child name.
    Name(String),
    /// A reserved introspection token.
    Reserved(Reserved),
    /// A new element requested from a port array, with a suggested name
    /// (empty when none was given).
    Allocate(String),
}

impl fmt::Display for LocalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalStep::Name(name) => f.write_str(name),
            LocalStep::Reserved(reserved) => f.write_str(reserved.display_name()),
            LocalStep::Allocate(name) if name.is_empty() => f.write_str("(allocate)"),
            LocalStep::Allocate(name) => write!(f, "(allocate:{name})"),
        }
    }
}

/// An ordered list of steps from a containing block to an element.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct LocalPath {
    /// The steps, outermost first.
    pub steps: Vec<LocalStep>,
}

impl LocalPath {
    /// The empty path, addressing the containing element itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a path of plain names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            steps: names
                .iter()
                .map(|n| LocalStep::Name(n.as_ref().to_string()))
                .collect(),
        }
    }

    /// Parses a dotted path of plain names, such as `sink.float_param`.
    pub fn parse_dotted(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::new();
        }
        Self::from_names(&dotted.split('.').collect::<Vec<_>>())
    }

    /// Returns a copy of this path with one more step appended.
    pub fn with(&self, step: LocalStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// Returns a copy of this path with a plain name appended.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        self.with(LocalStep::Name(name.into()))
    }

    /// Returns a copy of this path with a reserved step appended.
    pub fn with_reserved(&self, reserved: Reserved) -> Self {
        self.with(LocalStep::Reserved(reserved))
    }

    /// Returns a copy of this path with an allocate step appended.
    pub fn with_allocate(&self, suggested: Option<&str>) -> Self {
        self.with(LocalStep::Allocate(suggested.unwrap_or_default().to_string()))
    }

    /// Returns the concatenation of this path and `suffix`.
    pub fn concat(&self, suffix: &LocalPath) -> Self {
        let mut steps = self.steps.clone();
        steps.extend(suffix.steps.iter().cloned());
        Self { steps }
    }

    /// Returns `true` if this path has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// If `self` starts with `prefix`, returns the remaining steps.
    pub fn strip_prefix(&self, prefix: &LocalPath) -> Option<LocalPath> {
        if self.steps.starts_with(&prefix.steps) {
            Some(Self {
                steps: self.steps[prefix.steps.len()..].to_vec(),
            })
        } else {
            None
        }
    }
}

/// Joins the steps with `.`, printing reserved steps as `(link)`,
/// `(is_connected)` and so on.
impl fmt::Display for LocalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}
