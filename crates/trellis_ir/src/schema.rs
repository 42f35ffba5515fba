//! Top-level containers: designs and library elements.

use crate::elem::{Bundle, HierarchyBlock, Link, Port};
use serde::{Deserialize, Serialize};

/// A complete design rooted at one block.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Design {
    /// The root block definition.
    pub contents: HierarchyBlock,
}

/// The definition of one library class.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum LibraryElement {
    /// A port class.
    Port(Port),
    /// A bundle class.
    Bundle(Bundle),
    /// A block class.
    Block(HierarchyBlock),
    /// A link class.
    Link(Link),
}

impl LibraryElement {
    /// Returns a short kind name for logs and listings.
    pub fn kind(&self) -> &'static str {
        match self {
            LibraryElement::Port(_) => "port",
            LibraryElement::Bundle(_) => "bundle",
            LibraryElement::Block(_) => "block",
            LibraryElement::Link(_) => "link",
        }
    }
}
