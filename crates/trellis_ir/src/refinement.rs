//! Refinements: type substitutions and forced parameter values.

use crate::elem::LibraryPath;
use crate::lit::ValueLit;
use crate::path::LocalPath;
use serde::{Deserialize, Serialize};

/// A forced parameter value, either literal or taken from another parameter.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum RefinementValue {
    /// A literal value.
    Literal(ValueLit),
    /// The value of the parameter at this design path.
    Ref(LocalPath),
}

/// Override instructions supplied alongside a design.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Refinements {
    /// Every instance of a class is replaced by another class.
    pub class_refinements: Vec<(LibraryPath, LibraryPath)>,
    /// The block at a design path is replaced by a class.
    pub instance_refinements: Vec<(LocalPath, LibraryPath)>,
    /// A parameter (relative path) of every instance of a class is forced.
    pub class_values: Vec<(LibraryPath, LocalPath, ValueLit)>,
    /// The parameter at a design path is forced.
    pub instance_values: Vec<(LocalPath, RefinementValue)>,
}

impl Refinements {
    /// Returns `true` if there is nothing to refine.
    pub fn is_empty(&self) -> bool {
        self.class_refinements.is_empty()
            && self.instance_refinements.is_empty()
            && self.class_values.is_empty()
            && self.instance_values.is_empty()
    }
}
