//! Constraint and value expressions.

use crate::lit::ValueLit;
use crate::path::LocalPath;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Operators over a single value.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Invert,
    Not,
    Min,
    Max,
    Center,
    Width,
}

/// Operators reducing or mapping over an array.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum UnarySetOp {
    Negate,
    Invert,
    Sum,
    AllTrue,
    AnyTrue,
    AllEq,
    AllUnique,
    Maximum,
    Minimum,
    SetExtract,
    Intersection,
    Hull,
    Flatten,
}

/// Operators over two values.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Mult,
    ShrinkMult,
    And,
    Or,
    Xor,
    Implies,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Max,
    Min,
    Intersection,
    Hull,
    Within,
    Range,
}

/// Operators applying a scalar to every element of an array.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BinarySetOp {
    Add,
    Mult,
}

/// A connection between a block port and a link port, with per-element
/// expansion filled in by the solver for arrays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectedExpr {
    /// The block-side port.
    pub block_port: Box<ValueExpr>,
    /// The link-side port.
    pub link_port: Box<ValueExpr>,
    /// Element-wise expansion of an array connection.
    pub expanded: Vec<ConnectedExpr>,
}

/// An export of an internal block port to an exterior (boundary) port.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportedExpr {
    /// The boundary port.
    pub exterior_port: Box<ValueExpr>,
    /// The port of the inner block (or inner link).
    pub internal_block_port: Box<ValueExpr>,
    /// Element-wise expansion of an array export.
    pub expanded: Vec<ExportedExpr>,
}

/// A value expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ValueExpr {
    /// A literal.
    Literal(ValueLit),
    /// A binary operator.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<ValueExpr>,
        /// Right operand.
        rhs: Box<ValueExpr>,
    },
    /// An array-scalar operator.
    BinarySet {
        /// The operator.
        op: BinarySetOp,
        /// The array operand.
        lhset: Box<ValueExpr>,
        /// The scalar operand.
        rhs: Box<ValueExpr>,
    },
    /// A unary operator.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        val: Box<ValueExpr>,
    },
    /// An array operator.
    UnarySet {
        /// The operator.
        op: UnarySetOp,
        /// The array operand.
        vals: Box<ValueExpr>,
    },
    /// An array literal of expressions.
    Array(Vec<ValueExpr>),
    /// A struct literal of named expressions.
    Struct(IndexMap<String, ValueExpr>),
    /// A range literal of bound expressions.
    Range {
        /// Lower bound.
        minimum: Box<ValueExpr>,
        /// Upper bound.
        maximum: Box<ValueExpr>,
    },
    /// A conditional.
    IfThenElse {
        /// Condition.
        cond: Box<ValueExpr>,
        /// Value if true.
        tru: Box<ValueExpr>,
        /// Value if false.
        fal: Box<ValueExpr>,
    },
    /// Extracts one element of an array.
    Extract {
        /// The array.
        container: Box<ValueExpr>,
        /// The element index.
        index: Box<ValueExpr>,
    },
    /// Projects the same relative path out of every element of an array.
    MapExtract {
        /// The array.
        container: Box<ValueExpr>,
        /// The path relative to each element.
        path: LocalPath,
    },
    /// A block port connected to a link port.
    Connected(ConnectedExpr),
    /// A block port array connected to a link port array.
    ConnectedArray(ConnectedExpr),
    /// An internal port exported to a boundary port.
    Exported(ExportedExpr),
    /// An internal port array exported to a boundary port array.
    ExportedArray(ExportedExpr),
    /// A directed assignment.
    Assign {
        /// The assigned parameter.
        dst: LocalPath,
        /// The assigned value.
        src: Box<ValueExpr>,
    },
    /// A bare reference.
    Ref(LocalPath),
}

impl ValueExpr {
    /// Returns the referenced path if this is a bare reference.
    pub fn as_ref_path(&self) -> Option<&LocalPath> {
        match self {
            ValueExpr::Ref(path) => Some(path),
            _ => None,
        }
    }

    /// Builds a `connected` constraint between two references.
    pub fn connected(block_port: LocalPath, link_port: LocalPath) -> Self {
        ValueExpr::Connected(ConnectedExpr {
            block_port: Box::new(ValueExpr::Ref(block_port)),
            link_port: Box::new(ValueExpr::Ref(link_port)),
            expanded: Vec::new(),
        })
    }

    /// Builds an `exported` constraint between two references.
    pub fn exported(exterior_port: LocalPath, internal_block_port: LocalPath) -> Self {
        ValueExpr::Exported(ExportedExpr {
            exterior_port: Box::new(ValueExpr::Ref(exterior_port)),
            internal_block_port: Box::new(ValueExpr::Ref(internal_block_port)),
            expanded: Vec::new(),
        })
    }
}
