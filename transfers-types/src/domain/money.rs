//! Type-safe monetary value with embedded currency.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::DomainError;

/// Currencies a wallet can be denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    BRL,
    USD,
}

impl Currency {
    /// Returns the ISO code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::BRL => "BRL",
            Currency::USD => "USD",
        }
    }

    /// Returns the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::BRL => "R$",
            Currency::USD => "$",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BRL" => Ok(Currency::BRL),
            "USD" => Ok(Currency::USD),
            other => Err(DomainError::InvalidCurrency(other.to_string())),
        }
    }
}

/// Type-safe money representation with embedded currency.
///
/// Amount is stored in minor units (centavos, cents) to avoid floating-point
/// precision issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::InvalidAmount(amount));
        }
        Ok(Self { amount, currency })
    }

    /// Creates a BRL value. Transfers are always settled in BRL.
    pub fn brl(amount: i64) -> Result<Self, DomainError> {
        Self::new(amount, Currency::BRL)
    }

    /// Creates a zero-value Money for the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Builds a value without the sign check. Only wallet arithmetic uses this,
    /// where the caller owns the non-negative guard.
    pub(crate) fn unchecked(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Returns the amount in minor units.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Checked addition - returns error if currencies don't match or the sum overflows.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(&other)?;
        let amount =
            self.amount
                .checked_add(other.amount)
                .ok_or(DomainError::BalanceOverflow {
                    balance: self.amount,
                    amount: other.amount,
                })?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }

    /// Checked subtraction - returns error if currencies don't match or result would be negative.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(&other)?;
        if self.amount < other.amount {
            return Err(DomainError::InsufficientBalance {
                available: self.amount,
                requested: other.amount,
            });
        }
        Ok(Money {
            amount: self.amount - other.amount,
            currency: self.currency,
        })
    }

    /// Returns true if this value covers `other` (same currency, amount >=).
    pub fn covers(&self, other: &Money) -> bool {
        self.currency == other.currency && self.amount >= other.amount
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let major = (self.amount / 100).abs();
        let minor = (self.amount % 100).abs();
        write!(f, "{}{}{}.{:02}", sign, self.currency.symbol(), major, minor)
    }
}
