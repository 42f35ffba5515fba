//! Typed expression handles and literal conversions.

use super::{Binding, Expr, ExprKind};
use crate::range::Range;
use std::fmt::Debug;
use trellis_ir::ValueLit;

/// A typed handle over an [`Expr`].
pub trait TypedExpr: Clone + Debug + 'static {
    /// The concrete value type, as read back from the solver.
    type Value;

    /// The value kind of this handle type.
    fn kind() -> ExprKind;

    /// Wraps an untyped node. The node's kind must be [`kind`](Self::kind).
    fn wrap(expr: Expr) -> Self;

    /// The underlying node.
    fn expr(&self) -> &Expr;

    /// Encodes a value as a literal.
    fn to_lit(value: &Self::Value) -> ValueLit;

    /// Decodes a literal, `None` on a kind mismatch.
    fn from_lit(lit: &ValueLit) -> Option<Self::Value>;

    /// A literal expression.
    fn literal(value: Self::Value) -> Self {
        Self::wrap(Expr::literal(Self::kind(), Self::to_lit(&value)))
    }
}

macro_rules! scalar_handle {
    ($(#[$meta:meta])* $name:ident, $kind:ident, $value:ty, |$v:ident| $to:expr, |$l:ident| $from:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name(pub(crate) Expr);

        impl TypedExpr for $name {
            type Value = $value;

            fn kind() -> ExprKind {
                ExprKind::$kind
            }

            fn wrap(expr: Expr) -> Self {
                Self(expr)
            }

            fn expr(&self) -> &Expr {
                &self.0
            }

            fn to_lit($v: &Self::Value) -> ValueLit {
                $to
            }

            fn from_lit($l: &ValueLit) -> Option<Self::Value> {
                $from
            }
        }
    };
}

scalar_handle!(
    /// A boolean expression.
    BoolExpr, Bool, bool, |v| ValueLit::Boolean(*v), |l| l.as_bool()
);
scalar_handle!(
    /// An integer expression.
    IntExpr, Int, i64, |v| ValueLit::Integer(*v), |l| l.as_int()
);
scalar_handle!(
    /// A floating point expression.
    FloatExpr, Float, f64, |v| ValueLit::Floating(*v), |l| l.as_float()
);
scalar_handle!(
    /// An interval expression.
    RangeExpr,
    Range,
    Range,
    |v| ValueLit::Range {
        min: v.lower,
        max: v.upper
    },
    |l| l.as_range().map(|(lower, upper)| Range { lower, upper })
);
scalar_handle!(
    /// A string expression.
    StringExpr,
    String,
    String,
    |v| ValueLit::Text(v.clone()),
    |l| match l {
        ValueLit::Text(text) => Some(text.clone()),
        _ => None,
    }
);

impl From<bool> for BoolExpr {
    fn from(value: bool) -> Self {
        Self::literal(value)
    }
}

impl From<i64> for IntExpr {
    fn from(value: i64) -> Self {
        Self::literal(value)
    }
}

impl From<f64> for FloatExpr {
    fn from(value: f64) -> Self {
        Self::literal(value)
    }
}

impl From<i64> for FloatExpr {
    fn from(value: i64) -> Self {
        Self::literal(value as f64)
    }
}

impl From<Range> for RangeExpr {
    fn from(value: Range) -> Self {
        Self::literal(value)
    }
}

/// A literal range from `(lower, upper)`.
impl From<(f64, f64)> for RangeExpr {
    fn from((lower, upper): (f64, f64)) -> Self {
        Self::literal(Range { lower, upper })
    }
}

/// A single-point range built from a float expression.
impl From<FloatExpr> for RangeExpr {
    fn from(value: FloatExpr) -> Self {
        RangeExpr::from_bounds(value.clone(), value)
    }
}

impl From<&str> for StringExpr {
    fn from(value: &str) -> Self {
        Self::literal(value.to_string())
    }
}

impl From<String> for StringExpr {
    fn from(value: String) -> Self {
        Self::literal(value)
    }
}

impl RangeExpr {
    /// A range built from two float expressions.
    pub fn from_bounds(lower: impl Into<FloatExpr>, upper: impl Into<FloatExpr>) -> Self {
        RangeExpr(Expr::new(
            ExprKind::Range,
            Binding::RangeOf {
                lower: lower.into().0,
                upper: upper.into().0,
            },
        ))
    }

    /// The range of every value.
    pub fn all() -> Self {
        Range::all().into()
    }

    /// `center ± tolerance`, relative.
    pub fn from_tolerance(center: f64, tolerance: f64) -> Result<Self, crate::range::RangeError> {
        Range::from_tolerance(center, tolerance).map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_round_trip_through_lit() {
        let lit = RangeExpr::to_lit(&Range::exact(1.0));
        assert_eq!(RangeExpr::from_lit(&lit), Some(Range::exact(1.0)));
        assert_eq!(FloatExpr::from_lit(&ValueLit::Integer(2)), Some(2.0));
        assert_eq!(BoolExpr::from_lit(&ValueLit::Integer(2)), None);
    }

    #[test]
    fn range_from_float_builds_bounds() {
        let r: RangeExpr = FloatExpr::from(1.0).into();
        assert!(matches!(r.expr().binding(), Binding::RangeOf { .. }));
        let lit: RangeExpr = (1.0, 2.0).into();
        assert!(lit.expr().as_literal().is_some());
    }
}
