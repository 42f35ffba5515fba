//! Literal values, as written in constraints and returned by the solver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ValueLit {
    /// A boolean.
    Boolean(bool),
    /// A signed integer.
    Integer(i64),
    /// A floating point number.
    Floating(f64),
    /// A closed interval.
    Range {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// A string.
    Text(String),
    /// An array of literals of one kind.
    Array(Vec<ValueLit>),
}

impl ValueLit {
    /// Returns the boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ValueLit::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ValueLit::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the floating value; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ValueLit::Floating(v) => Some(*v),
            ValueLit::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the `(min, max)` bounds, if this is a range.
    pub fn as_range(&self) -> Option<(f64, f64)> {
        match self {
            ValueLit::Range { min, max } => Some((*min, *max)),
            _ => None,
        }
    }

    /// Returns the text, if this is a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ValueLit::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the elements, if this is an array.
    pub fn as_array(&self) -> Option<&[ValueLit]> {
        match self {
            ValueLit::Array(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ValueLit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueLit::Boolean(v) => write!(f, "{v}"),
            ValueLit::Integer(v) => write!(f, "{v}"),
            ValueLit::Floating(v) => write!(f, "{v}"),
            ValueLit::Range { min, max } => write!(f, "({min}, {max})"),
            ValueLit::Text(v) => write!(f, "{v:?}"),
            ValueLit::Array(vs) => {
                f.write_str("[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}
