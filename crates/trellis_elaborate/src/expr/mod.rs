//! Symbolic parameter expressions.
//!
//! An [`Expr`] is an immutable node holding exactly one [`Binding`]: a
//! literal, a parameter, or an operator over operand expressions and ports.
//! Typed handles ([`BoolExpr`], [`FloatExpr`], [`RangeExpr`] and so on) wrap an
//! `Expr` and provide the operator algebra; none of them implement
//! `PartialEq`, comparisons build new expression nodes instead.
//!
//! Expressions never embed live pointers in the IR. Serialization
//! ([`Expr::to_proto`]) resolves every parameter and port operand to a
//! structural path through a [`RefMap`].

mod array;
mod ops;
mod typed;

pub use array::ArrayExpr;
pub use ops::WithinOperand;
pub use typed::{BoolExpr, FloatExpr, IntExpr, RangeExpr, StringExpr, TypedExpr};

use crate::errors::{error_projection, error_unreachable, ElabError, ElabResult};
use crate::ids::{Owner, ParamId, PortId};
use crate::refmap::{Ref, RefMap};
use crate::session::Session;
use std::rc::Rc;
use trellis_ir::{
    BinaryOp, BinarySetOp, LocalPath, Reserved, UnaryOp, UnarySetOp, ValInit, ValueExpr, ValueLit,
};

/// The value type of an expression.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ExprKind {
    /// Boolean.
    Bool,
    /// Integer.
    Int,
    /// Floating point.
    Float,
    /// Closed interval.
    Range,
    /// String.
    String,
    /// Array of an element kind.
    Array(Box<ExprKind>),
}

impl ExprKind {
    /// The IR declaration of a parameter of this kind.
    pub fn val_init(&self) -> ValInit {
        match self {
            ExprKind::Bool => ValInit::Boolean,
            ExprKind::Int => ValInit::Integer,
            ExprKind::Float => ValInit::Floating,
            ExprKind::Range => ValInit::Range,
            ExprKind::String => ValInit::Text,
            ExprKind::Array(elt) => ValInit::Array(Box::new(elt.val_init())),
        }
    }

    /// Whether `lit` is a value of this kind. Integers are accepted as floats.
    pub fn admits(&self, lit: &ValueLit) -> bool {
        match (self, lit) {
            (ExprKind::Bool, ValueLit::Boolean(_))
            | (ExprKind::Int, ValueLit::Integer(_))
            | (ExprKind::Float, ValueLit::Floating(_) | ValueLit::Integer(_))
            | (ExprKind::Range, ValueLit::Range { .. })
            | (ExprKind::String, ValueLit::Text(_)) => true,
            (ExprKind::Array(elt), ValueLit::Array(elts)) => elts.iter().all(|e| elt.admits(e)),
            _ => false,
        }
    }
}

/// How one expression node reconstructs itself.
#[derive(Clone, Debug)]
pub enum Binding {
    /// A literal value.
    Literal(ValueLit),
    /// A declared parameter.
    Param(ParamId),
    /// A range built from two float bounds.
    RangeOf {
        /// Lower bound.
        lower: Expr,
        /// Upper bound.
        upper: Expr,
    },
    /// An array of expressions.
    Array(Vec<Expr>),
    /// A unary operator.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        val: Expr,
    },
    /// A reduction or elementwise operator over an array.
    UnarySet {
        /// The operator.
        op: UnarySetOp,
        /// The array operand.
        vals: Expr,
    },
    /// A binary operator.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Expr,
        /// Right operand.
        rhs: Expr,
    },
    /// An array-scalar operator.
    BinarySet {
        /// The operator.
        op: BinarySetOp,
        /// The array operand.
        lhset: Expr,
        /// The scalar operand.
        rhs: Expr,
    },
    /// A conditional.
    IfThenElse {
        /// Condition.
        cond: Expr,
        /// Value when true.
        tru: Expr,
        /// Value when false.
        fal: Expr,
    },
    /// Whether a port is connected.
    IsConnected(PortId),
    /// The name of a block or port.
    Name(Owner),
    /// The number of elements of a port array.
    Length(PortId),
    /// The names of the elements requested from a port array.
    Allocated(PortId),
    /// The same projection out of every element of a port array. `target`
    /// references the array's element sample.
    MapExtract {
        /// The port array.
        container: PortId,
        /// The projection of the sample.
        target: Expr,
    },
}

/// An operand reachable from an expression, for reachability checks.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    /// A parameter.
    Param(ParamId),
    /// A port, through introspection.
    Port(PortId),
    /// A block or port, through its name.
    Named(Owner),
}

/// An untyped expression node.
#[derive(Clone, Debug)]
pub struct Expr {
    kind: ExprKind,
    binding: Rc<Binding>,
}

impl Expr {
    /// Creates a node.
    pub fn new(kind: ExprKind, binding: Binding) -> Self {
        Self {
            kind,
            binding: Rc::new(binding),
        }
    }

    /// A literal node.
    pub fn literal(kind: ExprKind, lit: ValueLit) -> Self {
        Self::new(kind, Binding::Literal(lit))
    }

    /// A parameter reference node.
    pub fn param(kind: ExprKind, id: ParamId) -> Self {
        Self::new(kind, Binding::Param(id))
    }

    /// The value kind.
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// The binding.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Returns the literal if this node is one.
    pub fn as_literal(&self) -> Option<&ValueLit> {
        match &*self.binding {
            Binding::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Returns the parameter if this node is a bare parameter reference.
    pub fn as_param(&self) -> Option<ParamId> {
        match &*self.binding {
            Binding::Param(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether two handles share the same node.
    pub fn same_node(&self, other: &Expr) -> bool {
        Rc::ptr_eq(&self.binding, &other.binding)
    }

    /// The immediate operand expressions.
    pub fn subexprs(&self) -> Vec<&Expr> {
        match &*self.binding {
            Binding::Literal(_)
            | Binding::Param(_)
            | Binding::IsConnected(_)
            | Binding::Name(_)
            | Binding::Length(_)
            | Binding::Allocated(_) => vec![],
            Binding::RangeOf { lower, upper } => vec![lower, upper],
            Binding::Array(elts) => elts.iter().collect(),
            Binding::Unary { val, .. } => vec![val],
            Binding::UnarySet { vals, .. } => vec![vals],
            Binding::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Binding::BinarySet { lhset, rhs, .. } => vec![lhset, rhs],
            Binding::IfThenElse { cond, tru, fal } => vec![cond, tru, fal],
            // the target is relative to the array's sample, not the block
            Binding::MapExtract { .. } => vec![],
        }
    }

    /// Every parameter and port this expression reads, transitively.
    pub fn operands(&self) -> Vec<Operand> {
        let mut out = Vec::new();
        self.collect_operands(&mut out);
        out
    }

    fn collect_operands(&self, out: &mut Vec<Operand>) {
        match &*self.binding {
            Binding::Param(id) => out.push(Operand::Param(*id)),
            Binding::IsConnected(port)
            | Binding::Length(port)
            | Binding::Allocated(port)
            | Binding::MapExtract {
                container: port, ..
            } => out.push(Operand::Port(*port)),
            Binding::Name(owner) => out.push(Operand::Named(*owner)),
            _ => {}
        }
        for sub in self.subexprs() {
            sub.collect_operands(out);
        }
    }

    /// Serializes this expression, resolving operands through `refs`.
    pub fn to_proto(&self, s: &Session, refs: &RefMap) -> ElabResult<ValueExpr> {
        let boxed = |e: &Expr| -> ElabResult<Box<ValueExpr>> { Ok(Box::new(e.to_proto(s, refs)?)) };
        Ok(match &*self.binding {
            Binding::Literal(lit) => ValueExpr::Literal(lit.clone()),
            Binding::Param(id) => ValueExpr::Ref(resolve(s, refs, Ref::Param(*id))?),
            Binding::RangeOf { lower, upper } => ValueExpr::Range {
                minimum: boxed(lower)?,
                maximum: boxed(upper)?,
            },
            Binding::Array(elts) => ValueExpr::Array(
                elts.iter()
                    .map(|e| e.to_proto(s, refs))
                    .collect::<ElabResult<Vec<_>>>()?,
            ),
            Binding::Unary { op, val } => ValueExpr::Unary {
                op: *op,
                val: boxed(val)?,
            },
            Binding::UnarySet { op, vals } => ValueExpr::UnarySet {
                op: *op,
                vals: boxed(vals)?,
            },
            Binding::Binary { op, lhs, rhs } => ValueExpr::Binary {
                op: *op,
                lhs: boxed(lhs)?,
                rhs: boxed(rhs)?,
            },
            Binding::BinarySet { op, lhset, rhs } => ValueExpr::BinarySet {
                op: *op,
                lhset: boxed(lhset)?,
                rhs: boxed(rhs)?,
            },
            Binding::IfThenElse { cond, tru, fal } => ValueExpr::IfThenElse {
                cond: boxed(cond)?,
                tru: boxed(tru)?,
                fal: boxed(fal)?,
            },
            Binding::IsConnected(port) => ValueExpr::Ref(
                resolve(s, refs, Ref::Port(*port))?.with_reserved(Reserved::IsConnected),
            ),
            Binding::Name(owner) => {
                ValueExpr::Ref(resolve(s, refs, Ref::from(*owner))?.with_reserved(Reserved::Name))
            }
            Binding::Length(port) => ValueExpr::Ref(
                resolve(s, refs, Ref::Port(*port))?.with_reserved(Reserved::Length),
            ),
            Binding::Allocated(port) => ValueExpr::Ref(
                resolve(s, refs, Ref::Port(*port))?.with_reserved(Reserved::Allocated),
            ),
            Binding::MapExtract { container, target } => ValueExpr::MapExtract {
                container: Box::new(ValueExpr::Ref(resolve(s, refs, Ref::Port(*container))?)),
                path: sample_relative_path(s, *container, target)?,
            },
        })
    }
}

fn resolve(s: &Session, refs: &RefMap, r: Ref) -> ElabResult<LocalPath> {
    refs.path(r).cloned().ok_or_else(|| {
        ElabError::Unreachable(error_unreachable(&s.describe_context(), &s.describe_ref(r)))
    })
}

fn sample_relative_path(s: &Session, container: PortId, target: &Expr) -> ElabResult<LocalPath> {
    let sample = s.vector_sample(container)?;
    let sample_refs = RefMap::for_port(s, sample)?;
    let lookup = |r: Ref| {
        sample_refs.path(r).cloned().ok_or_else(|| {
            ElabError::Definition(error_projection(
                "projection must select an element of the array's element type",
            ))
        })
    };
    match &*target.binding {
        Binding::Param(id) => lookup(Ref::Param(*id)),
        Binding::IsConnected(port) => {
            Ok(lookup(Ref::Port(*port))?.with_reserved(Reserved::IsConnected))
        }
        Binding::Length(port) => Ok(lookup(Ref::Port(*port))?.with_reserved(Reserved::Length)),
        Binding::Allocated(port) => {
            Ok(lookup(Ref::Port(*port))?.with_reserved(Reserved::Allocated))
        }
        Binding::Name(owner) => Ok(lookup(Ref::from(*owner))?.with_reserved(Reserved::Name)),
        _ => Err(ElabError::Definition(error_projection(
            "array projection must return a parameter or introspection value, not a computed expression",
        ))),
    }
}
