//! Wallet held by exactly one user.

use serde::{Deserialize, Serialize};

use super::money::{Currency, Money};

/// Per-user balance holder in a single currency.
///
/// `add` and `sub` are low-level arithmetic primitives. `sub` trusts its
/// caller: it happily drives the balance below zero, so every debit path must
/// check the balance first (see `User::withdraw` and the conditional debit in
/// the repositories).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    money: Money,
}

impl Wallet {
    pub fn new(money: Money) -> Self {
        Self { money }
    }

    pub fn money(&self) -> Money {
        self.money
    }

    pub fn amount(&self) -> i64 {
        self.money.amount()
    }

    pub fn currency(&self) -> Currency {
        self.money.currency()
    }

    /// Adds `amount` minor units.
    pub fn add(&mut self, amount: i64) {
        self.money = Money::unchecked(self.money.amount().saturating_add(amount), self.currency());
    }

    /// Subtracts `amount` minor units, unguarded.
    pub fn sub(&mut self, amount: i64) {
        self.money = Money::unchecked(self.money.amount().saturating_sub(amount), self.currency());
    }
}
