use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const RAND_CURRENCY_CODE: &str = "ZAR";
pub const RAND_CURRENCY_CODE_LOWER: &str = "zar";

//--------------------------------------      Cents        -----------------------------------------------------------
/// An amount of money in South African cents. All monetary arithmetic in the engine happens in integer minor units.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);

impl Mul<i64> for Cents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Cents {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Cents {}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CentsConversionError(format!("Value {} is too large to convert to Cents", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rands = self.0 as f64 / 100.0;
        write!(f, "R{rands:0.2}")
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_rands(rands: i64) -> Self {
        Self(rands * 100)
    }

    /// Absolute difference between two amounts. Used for tolerance checks against provider-reported charges.
    pub fn abs_diff(&self, other: Cents) -> Cents {
        Cents((self.0 - other.0).abs())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_formats_rands_with_two_decimals() {
        assert_eq!(Cents::from(5000).to_string(), "R50.00");
        assert_eq!(Cents::from(750).to_string(), "R7.50");
        assert_eq!(Cents::from(4250).to_string(), "R42.50");
        assert_eq!(Cents::from(1).to_string(), "R0.01");
    }

    #[test]
    fn arithmetic() {
        let a = Cents::from_rands(50);
        let b = Cents::from(750);
        assert_eq!(a - b, Cents::from(4250));
        assert_eq!(a + b, Cents::from(5750));
        assert_eq!(a.abs_diff(b), Cents::from(4250));
        assert_eq!(b.abs_diff(a), Cents::from(4250));
        assert_eq!(-b, Cents::from(-750));
    }
}
