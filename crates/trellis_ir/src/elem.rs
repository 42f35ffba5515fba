//! Library element definitions: ports, bundles, blocks and links.

use crate::expr::ValueExpr;
use crate::path::LocalPath;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A reference to a library class by name.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct LibraryPath {
    /// The class name.
    pub target: String,
}

impl LibraryPath {
    /// Creates a library path for a class name.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

/// The declared type of a parameter.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ValInit {
    Boolean,
    Integer,
    Floating,
    Range,
    Text,
    Array(Box<ValInit>),
}

/// Free-form structured metadata.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Nested members.
    pub members: IndexMap<String, Metadata>,
    /// A text leaf.
    pub text: Option<String>,
}

impl Metadata {
    /// A text leaf.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            text: Some(value.into()),
            ..Self::default()
        }
    }

    /// Adds a nested member, replacing any member of the same name.
    pub fn with_member(mut self, name: impl Into<String>, value: impl Into<Metadata>) -> Self {
        self.members.insert(name.into(), value.into());
        self
    }

    /// Whether this has neither members nor text.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.text.is_none()
    }
}

impl From<&str> for Metadata {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Metadata {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

/// A parameters-only port definition.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Port {
    /// Declared parameters.
    pub params: IndexMap<String, ValInit>,
    /// Constraints over the parameters.
    pub constraints: IndexMap<String, ValueExpr>,
    /// This class.
    pub self_class: Option<LibraryPath>,
    /// Superclasses, nearest first.
    pub superclasses: Vec<LibraryPath>,
    /// Metadata.
    pub meta: Option<Metadata>,
}

/// A port with sub-ports.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Bundle {
    /// Declared parameters.
    pub params: IndexMap<String, ValInit>,
    /// Sub-ports.
    pub ports: IndexMap<String, PortLike>,
    /// Constraints over the parameters.
    pub constraints: IndexMap<String, ValueExpr>,
    /// This class.
    pub self_class: Option<LibraryPath>,
    /// Superclasses, nearest first.
    pub superclasses: Vec<LibraryPath>,
    /// Metadata.
    pub meta: Option<Metadata>,
}

/// A homogeneous port array.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PortArray {
    /// The element class.
    pub self_class: LibraryPath,
    /// The elements, present once the array has been marked defined (possibly
    /// empty), absent while the length is left to the enclosing design.
    pub ports: Option<IndexMap<String, PortLike>>,
}

/// Any port-shaped element.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum PortLike {
    /// A reference to a library port class.
    LibElem(LibraryPath),
    /// An inline port definition.
    Port(Port),
    /// An inline bundle definition.
    Bundle(Bundle),
    /// A port array.
    Array(PortArray),
}

/// Generator record of a block stub.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Generator {
    /// Parameters that must be solved before the generator can run.
    pub required_params: Vec<LocalPath>,
}

/// A child block declaration by class, with attached mixins.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BlockLibElem {
    /// The block class.
    pub base: LibraryPath,
    /// Interface mixins attached to the block.
    pub mixins: Vec<LibraryPath>,
}

/// A hierarchical block definition.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct HierarchyBlock {
    /// Declared parameters.
    pub params: IndexMap<String, ValInit>,
    /// Self-contained default values of constructor parameters.
    pub param_defaults: IndexMap<String, ValueExpr>,
    /// Boundary ports.
    pub ports: IndexMap<String, PortLike>,
    /// Child blocks.
    pub blocks: IndexMap<String, BlockLike>,
    /// Links created by connections.
    pub links: IndexMap<String, LinkLike>,
    /// Constraints, including connections and assignments.
    pub constraints: IndexMap<String, ValueExpr>,
    /// This class.
    pub self_class: Option<LibraryPath>,
    /// Superclasses in linearization order.
    pub superclasses: Vec<LibraryPath>,
    /// The class this definition was requested as, before refinement.
    pub prerefine_class: Option<LibraryPath>,
    /// Present on generator stubs.
    pub generator: Option<Generator>,
    /// Whether this block must be refined before use in a design.
    pub is_abstract: bool,
    /// Refinement used for an abstract block when none is given.
    pub default_refinement: Option<LibraryPath>,
    /// Metadata.
    pub meta: Option<Metadata>,
}

/// Any block-shaped element.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum BlockLike {
    /// A reference to a library block class.
    LibElem(BlockLibElem),
    /// An inline block definition.
    Hierarchy(Box<HierarchyBlock>),
}

/// A link definition.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Link {
    /// Declared parameters.
    pub params: IndexMap<String, ValInit>,
    /// Role ports.
    pub ports: IndexMap<String, PortLike>,
    /// Inner links.
    pub links: IndexMap<String, LinkLike>,
    /// Constraints.
    pub constraints: IndexMap<String, ValueExpr>,
    /// This class.
    pub self_class: Option<LibraryPath>,
    /// Superclasses, nearest first.
    pub superclasses: Vec<LibraryPath>,
    /// Metadata.
    pub meta: Option<Metadata>,
}

/// An array of links, one per element of connected port arrays.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct LinkArray {
    /// The element link class.
    pub self_class: LibraryPath,
    /// Role ports, expanded by the solver.
    pub ports: IndexMap<String, PortLike>,
    /// Constraints, expanded by the solver.
    pub constraints: IndexMap<String, ValueExpr>,
    /// Element links, expanded by the solver.
    pub links: IndexMap<String, LinkLike>,
}

/// Any link-shaped element.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum LinkLike {
    /// A reference to a library link class.
    LibElem(LibraryPath),
    /// An inline link definition.
    Link(Box<Link>),
    /// A link array.
    Array(LinkArray),
}

impl LinkLike {
    /// Returns the link class this element refers to.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            LinkLike::LibElem(path) => Some(&path.target),
            LinkLike::Link(link) => link.self_class.as_ref().map(|c| c.target.as_str()),
            LinkLike::Array(array) => Some(&array.self_class.target),
        }
    }
}

impl BlockLike {
    /// Returns the block class this element refers to.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            BlockLike::LibElem(elem) => Some(&elem.base.target),
            BlockLike::Hierarchy(block) => block.self_class.as_ref().map(|c| c.target.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_nests_members_in_order() {
        let meta = Metadata::default()
            .with_member("refdes", "U1")
            .with_member("part", Metadata::default().with_member("mfr", "Acme"));
        assert!(!meta.is_empty());
        assert_eq!(meta.members.keys().collect::<Vec<_>>(), ["refdes", "part"]);
        assert_eq!(meta.members["refdes"].text.as_deref(), Some("U1"));
        assert_eq!(
            meta.members["part"].members["mfr"],
            Metadata::text("Acme")
        );
        assert!(Metadata::default().is_empty());
    }

    #[test]
    fn undefined_array_differs_from_empty() {
        let undefined = PortArray {
            self_class: LibraryPath::new("TestPortSink"),
            ports: None,
        };
        let empty = PortArray {
            self_class: LibraryPath::new("TestPortSink"),
            ports: Some(IndexMap::new()),
        };
        assert_ne!(undefined, empty);
    }

    #[test]
    fn class_names() {
        let block = BlockLike::LibElem(BlockLibElem {
            base: LibraryPath::new("TestBlockSink"),
            mixins: vec![],
        });
        assert_eq!(block.class_name(), Some("TestBlockSink"));
        let link = LinkLike::Array(LinkArray {
            self_class: LibraryPath::new("TestLink"),
            ports: IndexMap::new(),
            constraints: IndexMap::new(),
            links: IndexMap::new(),
        });
        assert_eq!(link.class_name(), Some("TestLink"));
    }
}
