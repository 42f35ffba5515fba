//! Closed interval arithmetic over `f64`.
//!
//! [`Range`] is the concrete value behind range-typed parameters. Generators
//! receive solved ranges as `Range` values, and range literals in expressions
//! serialize from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Multiplicative slack used by [`Range::fuzzy_in`] to absorb
/// double-to-float round trips.
pub const DOUBLE_FLOAT_ROUND_FACTOR: f64 = 1e-7;

/// Invalid range construction or operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeError {
    /// Lower bound above upper bound.
    #[error("invalid range with lower {lower} > upper {upper}")]
    Inverted {
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },
    /// Intersection of disjoint ranges.
    #[error("cannot intersect disjoint ranges {0} and {1}")]
    Disjoint(Range, Range),
    /// Division by a range containing zero in its interior.
    #[error("cannot divide by {0}, which straddles zero")]
    StraddlesZero(Range),
    /// Tolerance-shrinking multiply with a contributing tolerance wider than the target.
    #[error("empty range in shrink-multiply of {target} by {contributing}")]
    EmptyShrink {
        /// The target range.
        target: Range,
        /// The contributing range.
        contributing: Range,
    },
    /// Negative bidirectional tolerance.
    #[error("tolerance {0} must not be negative")]
    NegativeTolerance(f64),
}

/// An inclusive interval `[lower, upper]`.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Range {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

impl Range {
    /// Creates a range, rejecting `lower > upper`. Two NaN bounds are allowed.
    pub fn new(lower: f64, upper: f64) -> Result<Self, RangeError> {
        if lower <= upper || (lower.is_nan() && upper.is_nan()) {
            Ok(Self { lower, upper })
        } else {
            Err(RangeError::Inverted { lower, upper })
        }
    }

    /// A single-point range.
    pub const fn exact(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    /// The range of every value.
    pub const fn all() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// From `lower` to positive infinity.
    pub const fn from_lower(lower: f64) -> Self {
        Self {
            lower,
            upper: f64::INFINITY,
        }
    }

    /// From negative infinity to `upper`.
    pub const fn from_upper(upper: f64) -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper,
        }
    }

    /// `center` with a relative tolerance of `±tolerance`.
    pub fn from_tolerance(center: f64, tolerance: f64) -> Result<Self, RangeError> {
        if tolerance < 0.0 {
            return Err(RangeError::NegativeTolerance(tolerance));
        }
        let a = center * (1.0 - tolerance);
        let b = center * (1.0 + tolerance);
        Self::new(a.min(b), a.max(b))
    }

    /// `center` with an asymmetric relative tolerance `(negative, positive)`.
    pub fn from_tolerance_pair(center: f64, tolerance: (f64, f64)) -> Result<Self, RangeError> {
        if tolerance.0 > tolerance.1 {
            return Err(RangeError::Inverted {
                lower: tolerance.0,
                upper: tolerance.1,
            });
        }
        Self::new(center * (1.0 + tolerance.0), center * (1.0 + tolerance.1))
    }

    /// `center` with an absolute tolerance of `±tolerance`.
    pub fn from_abs_tolerance(center: f64, tolerance: f64) -> Result<Self, RangeError> {
        if tolerance < 0.0 {
            return Err(RangeError::NegativeTolerance(tolerance));
        }
        Self::new(center - tolerance, center + tolerance)
    }

    /// Midpoint.
    pub fn center(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    /// Width of the interval.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Whether `value` lies within the range.
    pub fn contains_value(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Whether `other` is a subset of this range.
    pub fn contains(&self, other: &Range) -> bool {
        self.lower <= other.lower && other.upper <= self.upper
    }

    /// Subset test with the container widened by [`DOUBLE_FLOAT_ROUND_FACTOR`].
    pub fn fuzzy_in(&self, container: &Range) -> bool {
        let lower = if container.lower >= 0.0 {
            container.lower * (1.0 - DOUBLE_FLOAT_ROUND_FACTOR)
        } else {
            container.lower * (1.0 + DOUBLE_FLOAT_ROUND_FACTOR)
        };
        let upper = if container.upper >= 0.0 {
            container.upper * (1.0 + DOUBLE_FLOAT_ROUND_FACTOR)
        } else {
            container.upper * (1.0 - DOUBLE_FLOAT_ROUND_FACTOR)
        };
        Range { lower, upper }.contains(self)
    }

    /// Elementwise min of lowers and max of uppers.
    pub fn hull(&self, other: &Range) -> Range {
        Range {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Whether the two ranges overlap.
    pub fn intersects(&self, other: &Range) -> bool {
        self.upper >= other.lower && self.lower <= other.upper
    }

    /// The overlap of two ranges; fails when they are disjoint.
    pub fn intersect(&self, other: &Range) -> Result<Range, RangeError> {
        if !self.intersects(other) {
            return Err(RangeError::Disjoint(*self, *other));
        }
        Ok(Range {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        })
    }

    /// Tolerance-budgeting division: the range that, multiplied by
    /// `contributing`, stays within `self`.
    ///
    /// Computes `(contributing.upper * self.lower, contributing.lower * self.upper)`
    /// and fails when that is empty.
    pub fn shrink_multiply(&self, contributing: &Range) -> Result<Range, RangeError> {
        let lower = contributing.upper * self.lower;
        let upper = contributing.lower * self.upper;
        if lower > upper {
            return Err(RangeError::EmptyShrink {
                target: *self,
                contributing: *contributing,
            });
        }
        Ok(Range { lower, upper })
    }

    /// Interval division through the four corner quotients.
    pub fn checked_div(&self, other: &Range) -> Result<Range, RangeError> {
        if !(other.lower >= 0.0 || other.upper <= 0.0) {
            return Err(RangeError::StraddlesZero(*other));
        }
        Ok(Self::from_corners([
            self.lower / other.lower,
            self.lower / other.upper,
            self.upper / other.lower,
            self.upper / other.upper,
        ]))
    }

    /// `numerator / self`; fails when `self` straddles zero.
    pub fn invert_scaled(&self, numerator: f64) -> Result<Range, RangeError> {
        if !(self.lower >= 0.0 || self.upper <= 0.0) {
            return Err(RangeError::StraddlesZero(*self));
        }
        Ok(Self::from_corners([
            numerator / self.upper,
            numerator / self.lower,
            numerator / self.upper,
            numerator / self.lower,
        ]))
    }

    /// Clamps this range into `bounds`, collapsing to the nearer edge when
    /// the two do not overlap.
    pub fn bound_to(&self, bounds: &Range) -> Range {
        let clamp = |v: f64| v.max(bounds.lower).min(bounds.upper);
        Range {
            lower: clamp(self.lower),
            upper: clamp(self.upper),
        }
    }

    fn from_corners(corners: [f64; 4]) -> Range {
        let lower = corners.iter().copied().fold(f64::INFINITY, f64::min);
        let upper = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Range { lower, upper }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lower, self.upper)
    }
}

impl Add for Range {
    type Output = Range;

    fn add(self, rhs: Range) -> Range {
        Range {
            lower: self.lower + rhs.lower,
            upper: self.upper + rhs.upper,
        }
    }
}

impl Add<f64> for Range {
    type Output = Range;

    fn add(self, rhs: f64) -> Range {
        Range {
            lower: self.lower + rhs,
            upper: self.upper + rhs,
        }
    }
}

/// Shifts by a scalar. Range-by-range subtraction is deliberately absent.
impl Sub<f64> for Range {
    type Output = Range;

    fn sub(self, rhs: f64) -> Range {
        Range {
            lower: self.lower - rhs,
            upper: self.upper - rhs,
        }
    }
}

impl Mul for Range {
    type Output = Range;

    fn mul(self, rhs: Range) -> Range {
        Range::from_corners([
            self.lower * rhs.lower,
            self.lower * rhs.upper,
            self.upper * rhs.lower,
            self.upper * rhs.upper,
        ])
    }
}

impl Mul<f64> for Range {
    type Output = Range;

    fn mul(self, rhs: f64) -> Range {
        if rhs >= 0.0 {
            Range {
                lower: self.lower * rhs,
                upper: self.upper * rhs,
            }
        } else {
            Range {
                lower: self.upper * rhs,
                upper: self.lower * rhs,
            }
        }
    }
}
