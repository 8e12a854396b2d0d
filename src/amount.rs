//! Whole-unit currency amounts.
//!
//! Contributions are accounted in the currency's smallest unit, so amounts are
//! plain non-negative integers. Text input goes through `rust_decimal` so that
//! values such as `"30000.0"` are accepted while fractional or negative
//! values are rejected instead of being silently truncated.

use crate::error::TontineError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A non-negative integer amount of money.
///
/// Arithmetic saturates instead of wrapping; subtraction is only offered as
/// [`Amount::saturating_sub`] and [`Amount::signed_diff`] so a negative amount
/// can never be represented.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use tontine_ledger::Amount;
///
/// let amount = Amount::from_str("30000.0").unwrap();
/// assert_eq!(amount, Amount::new(30_000));
/// assert!(Amount::from_str("12.5").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    /// Zero value.
    pub const ZERO: Self = Amount(0);

    /// Creates an amount from a whole number of units.
    pub const fn new(units: u64) -> Self {
        Amount(units)
    }

    /// Returns the amount as a number of units.
    pub const fn units(self) -> u64 {
        self.0
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies by a day count (or any other factor), saturating.
    pub fn times(self, factor: u64) -> Self {
        Amount(self.0.saturating_mul(factor))
    }

    /// `self - rhs`, floored at zero.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Amount(self.0.saturating_sub(rhs.0))
    }

    /// `self - rhs` as a signed value.
    pub fn signed_diff(self, rhs: Self) -> i64 {
        let lhs = i128::from(self.0);
        let rhs = i128::from(rhs.0);
        (lhs - rhs).clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    /// Parses an amount that must be strictly positive.
    pub fn parse_positive(s: &str) -> Result<Self, TontineError> {
        let amount = Amount::from_str(s)?;
        if amount.is_zero() {
            return Err(TontineError::InvalidAmount(s.trim().to_string()));
        }
        Ok(amount)
    }
}

impl FromStr for Amount {
    type Err = TontineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || TontineError::InvalidAmount(trimmed.to_string());

        let decimal = Decimal::from_str(trimmed).map_err(|_| invalid())?;
        if decimal.is_sign_negative() && !decimal.is_zero() {
            return Err(invalid());
        }
        if !decimal.fract().is_zero() {
            return Err(invalid());
        }
        decimal.trunc().to_u64().map(Amount).ok_or_else(invalid)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Amount(units)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}
