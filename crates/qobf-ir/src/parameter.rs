//! Gate angle expressions.
//!
//! Angles are kept as small expression trees so that a circuit read as
//! `rz(pi/2)` is written back the same way instead of as a float literal.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// A numeric parameter expression over constants and π.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// The constant π.
    Pi,
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Addition.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Subtraction.
    Sub(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Multiplication.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Division.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Exponentiation.
    Pow(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Natural exponential `exp(x)`.
    Exp(Box<ParameterExpression>),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a π constant.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// Evaluate to a concrete value.
    ///
    /// Returns `None` for division by zero or a non-finite result.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            ParameterExpression::Constant(v) => *v,
            ParameterExpression::Pi => PI,
            ParameterExpression::Neg(e) => -e.as_f64()?,
            ParameterExpression::Add(a, b) => a.as_f64()? + b.as_f64()?,
            ParameterExpression::Sub(a, b) => a.as_f64()? - b.as_f64()?,
            ParameterExpression::Mul(a, b) => a.as_f64()? * b.as_f64()?,
            ParameterExpression::Div(a, b) => {
                let divisor = b.as_f64()?;
                if divisor == 0.0 {
                    return None;
                }
                a.as_f64()? / divisor
            }
            ParameterExpression::Pow(a, b) => a.as_f64()?.powf(b.as_f64()?),
            ParameterExpression::Exp(e) => e.as_f64()?.exp(),
        };
        value.is_finite().then_some(value)
    }

    /// Binding strength used when printing, higher binds tighter.
    fn precedence(&self) -> u8 {
        match self {
            ParameterExpression::Add(..) | ParameterExpression::Sub(..) => 1,
            ParameterExpression::Mul(..) | ParameterExpression::Div(..) => 2,
            ParameterExpression::Neg(_) => 3,
            ParameterExpression::Pow(..) => 4,
            ParameterExpression::Constant(v) if *v < 0.0 => 3,
            ParameterExpression::Constant(_)
            | ParameterExpression::Pi
            | ParameterExpression::Exp(_) => 5,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        if self.precedence() < min_prec {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Pi => write!(f, "pi"),
            ParameterExpression::Neg(e) => {
                write!(f, "-")?;
                e.fmt_operand(f, 4)
            }
            ParameterExpression::Add(a, b) => {
                a.fmt_operand(f, 1)?;
                write!(f, " + ")?;
                b.fmt_operand(f, 2)
            }
            ParameterExpression::Sub(a, b) => {
                a.fmt_operand(f, 1)?;
                write!(f, " - ")?;
                b.fmt_operand(f, 2)
            }
            ParameterExpression::Mul(a, b) => {
                a.fmt_operand(f, 2)?;
                write!(f, "*")?;
                b.fmt_operand(f, 3)
            }
            ParameterExpression::Div(a, b) => {
                a.fmt_operand(f, 2)?;
                write!(f, "/")?;
                b.fmt_operand(f, 3)
            }
            ParameterExpression::Pow(a, b) => {
                a.fmt_operand(f, 5)?;
                write!(f, "^")?;
                b.fmt_operand(f, 4)
            }
            ParameterExpression::Exp(e) => write!(f, "exp({e})"),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<i32> for ParameterExpression {
    fn from(value: i32) -> Self {
        ParameterExpression::Constant(f64::from(value))
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        ParameterExpression::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ParameterExpression::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let p = ParameterExpression::constant(1.5);
        assert_eq!(p.as_f64(), Some(1.5));
    }

    #[test]
    fn test_pi_arithmetic() {
        let p = ParameterExpression::pi() / ParameterExpression::from(2);
        assert!((p.as_f64().unwrap() - PI / 2.0).abs() < 1e-12);
        assert_eq!(p.to_string(), "pi/2");
    }

    #[test]
    fn test_division_by_zero() {
        let p = ParameterExpression::from(1) / ParameterExpression::from(0);
        assert_eq!(p.as_f64(), None);
    }

    #[test]
    fn test_exp_and_pow() {
        let p = ParameterExpression::Exp(Box::new(ParameterExpression::from(0)));
        assert_eq!(p.as_f64(), Some(1.0));

        let sq = ParameterExpression::Pow(
            Box::new(ParameterExpression::from(3)),
            Box::new(ParameterExpression::from(2)),
        );
        assert_eq!(sq.as_f64(), Some(9.0));
    }

    #[test]
    fn test_display_parenthesizes_by_precedence() {
        let sum = ParameterExpression::pi() + ParameterExpression::from(1);
        let scaled = sum * ParameterExpression::from(2);
        assert_eq!(scaled.to_string(), "(pi + 1)*2");

        let neg = -(ParameterExpression::pi() / ParameterExpression::from(4));
        assert_eq!(neg.to_string(), "-(pi/4)");
    }
}
