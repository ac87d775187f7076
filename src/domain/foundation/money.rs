//! Money value object.
//!
//! All monetary values are stored as i64 minor units (cents). No floats
//! anywhere in the ledger; display formatting is the only place a decimal
//! point appears.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

use super::ValidationError;

/// An amount of money in currency minor units (cents).
///
/// Balances may go negative (a negative balance is a credit). Ledger entry
/// amounts must be positive; use [`Money::positive`] when constructing them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a Money value from minor units.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a strictly positive Money value, as required for ledger
    /// entry amounts.
    pub fn positive(cents: i64) -> Result<Self, ValidationError> {
        if cents <= 0 {
            return Err(ValidationError::non_positive_amount("amount", cents));
        }
        Ok(Self(cents))
    }

    /// Returns the amount in minor units.
    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps the value at zero from below.
    ///
    /// Used for the balance updates that suppress residual negative
    /// balances (subscription invoice settlement, payoff remainders).
    pub fn floor_zero(&self) -> Self {
        Self(self.0.max(0))
    }

    /// Subtracts `other`, flooring the result at zero.
    pub fn saturating_reduce(&self, other: Money) -> Self {
        Self((self.0 - other.0).max(0))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
