//! The numeric tower: 32-bit ints, 64-bit longs and doubles.
//!
//! Integer kinds wrap on overflow. Mixed operands are promoted to the wider
//! kind (`Int` < `Long` < `Double`) before any operator is applied.

use std::fmt::Display;
use std::ops::{Add, Mul, Neg, Sub};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i32),
    Long(i64),
    Double(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("integer division by zero")]
    DivisionByZero,
}

/// Both operands converted to their common kind.
enum Promoted {
    Ints(i32, i32),
    Longs(i64, i64),
    Doubles(f64, f64),
}

impl Number {
    /// Build an integer literal from its decimal digits.
    ///
    /// The literal is reduced modulo 2^64 while it is accumulated, then
    /// narrowed to the requested width, so the stored value is always the
    /// literal modulo 2^32 (or 2^64) and never saturates.
    pub fn from_digits(digits: &str, long: bool) -> Number {
        let value = digits
            .bytes()
            .filter(u8::is_ascii_digit)
            .fold(0u64, |acc, d| acc.wrapping_mul(10).wrapping_add(u64::from(d - b'0')));

        if long {
            Number::Long(value as i64)
        } else {
            Number::Int(value as u32 as i32)
        }
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Number::Int(v) => v == 0,
            Number::Long(v) => v == 0,
            Number::Double(v) => v == 0.0,
        }
    }

    fn as_long(&self) -> i64 {
        match *self {
            Number::Int(v) => i64::from(v),
            Number::Long(v) => v,
            Number::Double(v) => v as i64,
        }
    }

    pub fn as_double(&self) -> f64 {
        match *self {
            Number::Int(v) => f64::from(v),
            Number::Long(v) => v as f64,
            Number::Double(v) => v,
        }
    }

    fn promote(self, other: Number) -> Promoted {
        match (self, other) {
            (Number::Int(l), Number::Int(r)) => Promoted::Ints(l, r),
            (Number::Double(_), _) | (_, Number::Double(_)) => {
                Promoted::Doubles(self.as_double(), other.as_double())
            }
            _ => Promoted::Longs(self.as_long(), other.as_long()),
        }
    }

    /// Integer kinds truncate toward zero; doubles follow IEEE-754.
    pub fn checked_div(self, other: Number) -> Result<Number, ArithmeticError> {
        match self.promote(other) {
            Promoted::Ints(_, 0) | Promoted::Longs(_, 0) => Err(ArithmeticError::DivisionByZero),
            Promoted::Ints(l, r) => Ok(Number::Int(l.wrapping_div(r))),
            Promoted::Longs(l, r) => Ok(Number::Long(l.wrapping_div(r))),
            Promoted::Doubles(l, r) => Ok(Number::Double(l / r)),
        }
    }

    /// Floored remainder: the result takes the sign of the divisor, so
    /// `-7 % 3` is `2` and `7 % -3` is `-2`.
    pub fn checked_rem(self, other: Number) -> Result<Number, ArithmeticError> {
        match self.promote(other) {
            Promoted::Ints(_, 0) | Promoted::Longs(_, 0) => Err(ArithmeticError::DivisionByZero),
            // |result| < |r|, so narrowing back cannot lose anything.
            Promoted::Ints(l, r) => Ok(Number::Int(floor_rem(i64::from(l), i64::from(r)) as i32)),
            Promoted::Longs(l, r) => Ok(Number::Long(floor_rem(l, r))),
            Promoted::Doubles(l, r) => {
                let rem = l % r;
                let rem = if rem != 0.0 && (rem < 0.0) != (r < 0.0) { rem + r } else { rem };
                Ok(Number::Double(rem))
            }
        }
    }

    pub fn compare(self, other: Number) -> Option<std::cmp::Ordering> {
        match self.promote(other) {
            Promoted::Ints(l, r) => Some(l.cmp(&r)),
            Promoted::Longs(l, r) => Some(l.cmp(&r)),
            Promoted::Doubles(l, r) => l.partial_cmp(&r),
        }
    }
}

fn floor_rem(l: i64, r: i64) -> i64 {
    let rem = l.wrapping_rem(r);
    if rem != 0 && (rem < 0) != (r < 0) {
        rem + r
    } else {
        rem
    }
}

impl Add for Number {
    type Output = Number;

    fn add(self, other: Number) -> Number {
        match self.promote(other) {
            Promoted::Ints(l, r) => Number::Int(l.wrapping_add(r)),
            Promoted::Longs(l, r) => Number::Long(l.wrapping_add(r)),
            Promoted::Doubles(l, r) => Number::Double(l + r),
        }
    }
}

impl Sub for Number {
    type Output = Number;

    fn sub(self, other: Number) -> Number {
        match self.promote(other) {
            Promoted::Ints(l, r) => Number::Int(l.wrapping_sub(r)),
            Promoted::Longs(l, r) => Number::Long(l.wrapping_sub(r)),
            Promoted::Doubles(l, r) => Number::Double(l - r),
        }
    }
}

impl Mul for Number {
    type Output = Number;

    fn mul(self, other: Number) -> Number {
        match self.promote(other) {
            Promoted::Ints(l, r) => Number::Int(l.wrapping_mul(r)),
            Promoted::Longs(l, r) => Number::Long(l.wrapping_mul(r)),
            Promoted::Doubles(l, r) => Number::Double(l * r),
        }
    }
}

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        match self {
            Number::Int(v) => Number::Int(v.wrapping_neg()),
            Number::Long(v) => Number::Long(v.wrapping_neg()),
            Number::Double(v) => Number::Double(-v),
        }
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Number::Int(v) => write!(f, "{v}"),
            Number::Long(v) => write!(f, "{v}"),
            Number::Double(v) if v.is_nan() => write!(f, "NaN"),
            Number::Double(v) if v == f64::INFINITY => write!(f, "Infinity"),
            Number::Double(v) if v == f64::NEG_INFINITY => write!(f, "-Infinity"),
            Number::Double(v) => {
                let text = v.to_string();
                if text.contains(['.', 'e']) {
                    write!(f, "{text}")
                } else {
                    write!(f, "{text}.0")
                }
            }
        }
    }
}
