//! The operator algebra over typed handles.
//!
//! Arithmetic goes through `std::ops`; comparisons, equality and range set
//! operations are methods returning new expression nodes.

use super::{Binding, BoolExpr, Expr, FloatExpr, IntExpr, RangeExpr, StringExpr, TypedExpr};
use crate::range::Range;
use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Sub};
use trellis_ir::{BinaryOp, UnaryOp};

pub(crate) fn unary<E: TypedExpr>(op: UnaryOp, val: &Expr) -> E {
    E::wrap(Expr::new(
        E::kind(),
        Binding::Unary {
            op,
            val: val.clone(),
        },
    ))
}

pub(crate) fn binary<E: TypedExpr>(op: BinaryOp, lhs: &Expr, rhs: &Expr) -> E {
    E::wrap(Expr::new(
        E::kind(),
        Binding::Binary {
            op,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        },
    ))
}

macro_rules! equality {
    ($($name:ident),*) => {$(
        impl $name {
            /// Equality, as a new boolean expression.
            pub fn equals(&self, other: impl Into<$name>) -> BoolExpr {
                binary(BinaryOp::Eq, &self.0, &other.into().0)
            }

            /// Inequality, as a new boolean expression.
            pub fn not_equals(&self, other: impl Into<$name>) -> BoolExpr {
                binary(BinaryOp::Neq, &self.0, &other.into().0)
            }
        }
    )*};
}

equality!(BoolExpr, IntExpr, FloatExpr, RangeExpr, StringExpr);

macro_rules! numeric {
    ($name:ident, $lit:ty) => {
        impl<T: Into<$name>> Add<T> for $name {
            type Output = $name;

            fn add(self, rhs: T) -> $name {
                binary(BinaryOp::Add, &self.0, &rhs.into().0)
            }
        }

        impl<T: Into<$name>> Sub<T> for $name {
            type Output = $name;

            fn sub(self, rhs: T) -> $name {
                self + (-rhs.into())
            }
        }

        impl<T: Into<$name>> Mul<T> for $name {
            type Output = $name;

            fn mul(self, rhs: T) -> $name {
                binary(BinaryOp::Mult, &self.0, &rhs.into().0)
            }
        }

        impl Neg for $name {
            type Output = $name;

            fn neg(self) -> $name {
                unary(UnaryOp::Negate, &self.0)
            }
        }

        impl Add<$name> for $lit {
            type Output = $name;

            fn add(self, rhs: $name) -> $name {
                $name::from(self) + rhs
            }
        }

        impl Sub<$name> for $lit {
            type Output = $name;

            fn sub(self, rhs: $name) -> $name {
                $name::from(self) - rhs
            }
        }

        impl Mul<$name> for $lit {
            type Output = $name;

            fn mul(self, rhs: $name) -> $name {
                $name::from(self) * rhs
            }
        }

        impl $name {
            /// `self > other`.
            pub fn gt(&self, other: impl Into<$name>) -> BoolExpr {
                binary(BinaryOp::Gt, &self.0, &other.into().0)
            }

            /// `self >= other`.
            pub fn ge(&self, other: impl Into<$name>) -> BoolExpr {
                binary(BinaryOp::Gte, &self.0, &other.into().0)
            }

            /// `self < other`.
            pub fn lt(&self, other: impl Into<$name>) -> BoolExpr {
                binary(BinaryOp::Lt, &self.0, &other.into().0)
            }

            /// `self <= other`.
            pub fn le(&self, other: impl Into<$name>) -> BoolExpr {
                binary(BinaryOp::Lte, &self.0, &other.into().0)
            }

            /// The larger of the two.
            pub fn max(&self, other: impl Into<$name>) -> $name {
                binary(BinaryOp::Max, &other.into().0, &self.0)
            }

            /// The smaller of the two.
            pub fn min(&self, other: impl Into<$name>) -> $name {
                binary(BinaryOp::Min, &other.into().0, &self.0)
            }
        }
    };
}

numeric!(IntExpr, i64);
numeric!(FloatExpr, f64);

impl<T: Into<FloatExpr>> Div<T> for FloatExpr {
    type Output = FloatExpr;

    fn div(self, rhs: T) -> FloatExpr {
        self * rhs.into().invert()
    }
}

impl FloatExpr {
    /// `1 / self`.
    pub fn invert(&self) -> FloatExpr {
        unary(UnaryOp::Invert, &self.0)
    }

    /// Whether this value lies within `range`.
    pub fn within(&self, range: impl Into<RangeExpr>) -> BoolExpr {
        binary(BinaryOp::Within, &self.0, &range.into().0)
    }
}

impl BoolExpr {
    /// Logical and.
    pub fn and(&self, other: impl Into<BoolExpr>) -> BoolExpr {
        binary(BinaryOp::And, &self.0, &other.into().0)
    }

    /// Logical or.
    pub fn or(&self, other: impl Into<BoolExpr>) -> BoolExpr {
        binary(BinaryOp::Or, &self.0, &other.into().0)
    }

    /// Exclusive or.
    pub fn xor(&self, other: impl Into<BoolExpr>) -> BoolExpr {
        binary(BinaryOp::Xor, &self.0, &other.into().0)
    }

    /// Logical implication.
    pub fn implies(&self, other: impl Into<BoolExpr>) -> BoolExpr {
        binary(BinaryOp::Implies, &self.0, &other.into().0)
    }

    /// Selects `tru` if this holds, else `fal`.
    pub fn then_else<E: TypedExpr>(&self, tru: impl Into<E>, fal: impl Into<E>) -> E {
        E::wrap(Expr::new(
            E::kind(),
            Binding::IfThenElse {
                cond: self.0.clone(),
                tru: tru.into().expr().clone(),
                fal: fal.into().expr().clone(),
            },
        ))
    }
}

impl<T: Into<BoolExpr>> BitAnd<T> for BoolExpr {
    type Output = BoolExpr;

    fn bitand(self, rhs: T) -> BoolExpr {
        self.and(rhs)
    }
}

impl<T: Into<BoolExpr>> BitOr<T> for BoolExpr {
    type Output = BoolExpr;

    fn bitor(self, rhs: T) -> BoolExpr {
        self.or(rhs)
    }
}

impl<T: Into<BoolExpr>> BitXor<T> for BoolExpr {
    type Output = BoolExpr;

    fn bitxor(self, rhs: T) -> BoolExpr {
        self.xor(rhs)
    }
}

impl Not for BoolExpr {
    type Output = BoolExpr;

    fn not(self) -> BoolExpr {
        unary(UnaryOp::Not, &self.0)
    }
}

/// A value that can be tested for containment in a range: a float (point
/// containment) or a range (subset).
pub trait WithinOperand {
    /// The operand node.
    fn within_operand(self) -> Expr;
}

impl WithinOperand for FloatExpr {
    fn within_operand(self) -> Expr {
        self.0
    }
}

impl WithinOperand for RangeExpr {
    fn within_operand(self) -> Expr {
        self.0
    }
}

impl WithinOperand for f64 {
    fn within_operand(self) -> Expr {
        FloatExpr::from(self).0
    }
}

impl WithinOperand for Range {
    fn within_operand(self) -> Expr {
        RangeExpr::from(self).0
    }
}

impl<T: Into<RangeExpr>> Add<T> for RangeExpr {
    type Output = RangeExpr;

    fn add(self, rhs: T) -> RangeExpr {
        binary(BinaryOp::Add, &self.0, &rhs.into().0)
    }
}

impl<T: Into<RangeExpr>> Sub<T> for RangeExpr {
    type Output = RangeExpr;

    fn sub(self, rhs: T) -> RangeExpr {
        self + (-rhs.into())
    }
}

impl Neg for RangeExpr {
    type Output = RangeExpr;

    fn neg(self) -> RangeExpr {
        unary(UnaryOp::Negate, &self.0)
    }
}

impl Mul<RangeExpr> for RangeExpr {
    type Output = RangeExpr;

    fn mul(self, rhs: RangeExpr) -> RangeExpr {
        binary(BinaryOp::Mult, &self.0, &rhs.0)
    }
}

/// Scales by a float, which stays a float operand in the IR.
impl Mul<FloatExpr> for RangeExpr {
    type Output = RangeExpr;

    fn mul(self, rhs: FloatExpr) -> RangeExpr {
        binary(BinaryOp::Mult, &self.0, &rhs.0)
    }
}

impl Mul<f64> for RangeExpr {
    type Output = RangeExpr;

    fn mul(self, rhs: f64) -> RangeExpr {
        self * FloatExpr::from(rhs)
    }
}

impl Div<RangeExpr> for RangeExpr {
    type Output = RangeExpr;

    fn div(self, rhs: RangeExpr) -> RangeExpr {
        self * rhs.invert()
    }
}

impl Div<FloatExpr> for RangeExpr {
    type Output = RangeExpr;

    fn div(self, rhs: FloatExpr) -> RangeExpr {
        self * rhs.invert()
    }
}

impl Div<f64> for RangeExpr {
    type Output = RangeExpr;

    fn div(self, rhs: f64) -> RangeExpr {
        self / FloatExpr::from(rhs)
    }
}

impl RangeExpr {
    /// `1 / self`, by interval reciprocal.
    pub fn invert(&self) -> RangeExpr {
        unary(UnaryOp::Invert, &self.0)
    }

    /// Tolerance-budgeting division, see [`Range::shrink_multiply`].
    pub fn shrink_multiply(&self, contributing: impl Into<RangeExpr>) -> RangeExpr {
        binary(BinaryOp::ShrinkMult, &self.0, &contributing.into().0)
    }

    /// Whether `item` (a float or a range) lies within this range.
    pub fn contains(&self, item: impl WithinOperand) -> BoolExpr {
        binary(BinaryOp::Within, &item.within_operand(), &self.0)
    }

    /// Whether this range is a subset of `other`.
    pub fn within(&self, other: impl Into<RangeExpr>) -> BoolExpr {
        binary(BinaryOp::Within, &self.0, &other.into().0)
    }

    /// The overlap of the two ranges.
    pub fn intersect(&self, other: impl Into<RangeExpr>) -> RangeExpr {
        binary(BinaryOp::Intersection, &other.into().0, &self.0)
    }

    /// The smallest range covering both.
    pub fn hull(&self, other: impl Into<RangeExpr>) -> RangeExpr {
        binary(BinaryOp::Hull, &other.into().0, &self.0)
    }

    /// The lower bound.
    pub fn lower(&self) -> FloatExpr {
        unary(UnaryOp::Min, &self.0)
    }

    /// The upper bound.
    pub fn upper(&self) -> FloatExpr {
        unary(UnaryOp::Max, &self.0)
    }

    /// The midpoint.
    pub fn center(&self) -> FloatExpr {
        unary(UnaryOp::Center, &self.0)
    }

    /// The width.
    pub fn width(&self) -> FloatExpr {
        unary(UnaryOp::Width, &self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprKind;

    fn op_of(e: &Expr) -> Option<BinaryOp> {
        match e.binding() {
            Binding::Binary { op, .. } => Some(*op),
            _ => None,
        }
    }

    #[test]
    fn subtraction_is_addition_of_negation() {
        let diff = FloatExpr::from(3.0) - 1.0;
        let Binding::Binary { op, rhs, .. } = diff.expr().binding() else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            rhs.binding(),
            Binding::Unary {
                op: UnaryOp::Negate,
                ..
            }
        ));
    }

    #[test]
    fn division_multiplies_by_inverse() {
        let q = FloatExpr::from(1.0) / 2.0;
        assert_eq!(op_of(q.expr()), Some(BinaryOp::Mult));
        let r = RangeExpr::from((1.0, 2.0)) / RangeExpr::from((2.0, 4.0));
        assert_eq!(op_of(r.expr()), Some(BinaryOp::Mult));
    }

    #[test]
    fn contains_puts_item_on_the_left() {
        let range = RangeExpr::from((1.0, 4.0));
        let item = FloatExpr::from(2.0);
        let test = range.contains(item.clone());
        let Binding::Binary { op, lhs, rhs } = test.expr().binding() else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Within);
        assert!(lhs.same_node(item.expr()));
        assert!(rhs.same_node(range.expr()));
    }

    #[test]
    fn comparisons_build_bool_nodes() {
        let a = IntExpr::from(1i64);
        let cmp = a.ge(2i64);
        assert_eq!(*cmp.expr().kind(), ExprKind::Bool);
        assert_eq!(op_of(cmp.expr()), Some(BinaryOp::Gte));
        assert_eq!(op_of(a.equals(1i64).expr()), Some(BinaryOp::Eq));
    }

    #[test]
    fn conditional_takes_branch_kind() {
        let c = BoolExpr::from(true);
        let v: FloatExpr = c.then_else(FloatExpr::from(1.0), FloatExpr::from(2.0));
        assert_eq!(*v.expr().kind(), ExprKind::Float);
    }
}
