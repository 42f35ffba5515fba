//! Array expressions and their reductions.

use super::{Binding, BoolExpr, Expr, ExprKind, FloatExpr, IntExpr, RangeExpr, TypedExpr};
use std::marker::PhantomData;
use trellis_ir::{BinarySetOp, UnarySetOp, ValueLit};

/// An array of `E` expressions.
#[derive(Clone, Debug)]
pub struct ArrayExpr<E> {
    expr: Expr,
    _elt: PhantomData<E>,
}

impl<E: TypedExpr> TypedExpr for ArrayExpr<E> {
    type Value = Vec<E::Value>;

    fn kind() -> ExprKind {
        ExprKind::Array(Box::new(E::kind()))
    }

    fn wrap(expr: Expr) -> Self {
        Self {
            expr,
            _elt: PhantomData,
        }
    }

    fn expr(&self) -> &Expr {
        &self.expr
    }

    fn to_lit(value: &Self::Value) -> ValueLit {
        ValueLit::Array(value.iter().map(E::to_lit).collect())
    }

    fn from_lit(lit: &ValueLit) -> Option<Self::Value> {
        match lit {
            ValueLit::Array(elts) => elts.iter().map(E::from_lit).collect(),
            _ => None,
        }
    }
}

impl<E: TypedExpr> ArrayExpr<E> {
    /// An array of element expressions.
    pub fn of(elts: Vec<E>) -> Self {
        Self::wrap(Expr::new(
            Self::kind(),
            Binding::Array(elts.iter().map(|e| e.expr().clone()).collect()),
        ))
    }

    /// A literal array.
    pub fn from_values(values: Vec<E::Value>) -> Self {
        Self::literal(values)
    }

    fn reduce<R: TypedExpr>(&self, op: UnarySetOp) -> R {
        R::wrap(Expr::new(
            R::kind(),
            Binding::UnarySet {
                op,
                vals: self.expr.clone(),
            },
        ))
    }

    fn map_scalar(&self, op: BinarySetOp, rhs: E) -> Self {
        Self::wrap(Expr::new(
            Self::kind(),
            Binding::BinarySet {
                op,
                lhset: self.expr.clone(),
                rhs: rhs.expr().clone(),
            },
        ))
    }

    /// Whether all elements are equal.
    pub fn all_equal(&self) -> BoolExpr {
        self.reduce(UnarySetOp::AllEq)
    }

    /// Whether all elements are distinct.
    pub fn all_unique(&self) -> BoolExpr {
        self.reduce(UnarySetOp::AllUnique)
    }

    /// Adds `rhs` to every element.
    pub fn map_add(&self, rhs: impl Into<E>) -> Self {
        self.map_scalar(BinarySetOp::Add, rhs.into())
    }

    /// Multiplies every element by `rhs`.
    pub fn map_mul(&self, rhs: impl Into<E>) -> Self {
        self.map_scalar(BinarySetOp::Mult, rhs.into())
    }

    /// Negates every element.
    pub fn negate(&self) -> Self {
        self.reduce(UnarySetOp::Negate)
    }

    /// The single value all elements share. Unsolvable if they differ.
    pub fn equal_any(&self) -> E {
        self.reduce(UnarySetOp::SetExtract)
    }
}

impl ArrayExpr<BoolExpr> {
    /// Whether any element is true.
    pub fn any(&self) -> BoolExpr {
        self.reduce(UnarySetOp::AnyTrue)
    }

    /// Whether every element is true.
    pub fn all(&self) -> BoolExpr {
        self.reduce(UnarySetOp::AllTrue)
    }
}

impl ArrayExpr<IntExpr> {
    /// Sum of the elements.
    pub fn sum(&self) -> IntExpr {
        self.reduce(UnarySetOp::Sum)
    }
}

impl ArrayExpr<FloatExpr> {
    /// Sum of the elements.
    pub fn sum(&self) -> FloatExpr {
        self.reduce(UnarySetOp::Sum)
    }

    /// Largest element.
    pub fn max(&self) -> FloatExpr {
        self.reduce(UnarySetOp::Maximum)
    }

    /// Smallest element.
    pub fn min(&self) -> FloatExpr {
        self.reduce(UnarySetOp::Minimum)
    }

    /// Reciprocal of every element.
    pub fn invert(&self) -> Self {
        self.reduce(UnarySetOp::Invert)
    }
}

impl ArrayExpr<RangeExpr> {
    /// Interval sum of the elements.
    pub fn sum(&self) -> RangeExpr {
        self.reduce(UnarySetOp::Sum)
    }

    /// The overlap of every element.
    pub fn intersection(&self) -> RangeExpr {
        self.reduce(UnarySetOp::Intersection)
    }

    /// The smallest range covering every element.
    pub fn hull(&self) -> RangeExpr {
        self.reduce(UnarySetOp::Hull)
    }
}

impl<E: TypedExpr> ArrayExpr<ArrayExpr<E>> {
    /// Concatenates the inner arrays.
    pub fn flatten(&self) -> ArrayExpr<E> {
        self.reduce(UnarySetOp::Flatten)
    }
}
