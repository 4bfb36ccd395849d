//! The bank account value and its identifier.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::BankAccountError;
use super::money::{CurrencyCode, Money, MoneyError};

/// Identity of one bank account aggregate. Never the nil UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Uuid", into = "Uuid")]
pub struct BankAccountId(Uuid);

impl BankAccountId {
    /// Name used to tag journals and logs.
    pub const AGGREGATE_TYPE_NAME: &'static str = "BankAccount";

    /// Generates a fresh, time-ordered identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID.
    ///
    /// # Errors
    ///
    /// Returns the UUID back if it is nil.
    pub fn new(id: Uuid) -> Result<Self, Uuid> {
        if id.is_nil() { Err(id) } else { Ok(Self(id)) }
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl TryFrom<Uuid> for BankAccountId {
    type Error = String;

    fn try_from(id: Uuid) -> Result<Self, Self::Error> {
        Self::new(id).map_err(|_| "bank account id must not be nil".to_owned())
    }
}

impl From<BankAccountId> for Uuid {
    fn from(id: BankAccountId) -> Self {
        id.0
    }
}

impl FromStr for BankAccountId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Uuid::parse_str(s).map_err(|e| format!("invalid bank account id {s:?}: {e}"))?;
        Self::try_from(id)
    }
}

impl fmt::Display for BankAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A bank account: identity, limit and balance.
///
/// Every successful operation returns a new value; `0 <= balance <= limit`
/// holds for every value obtained through `create`, `add` or `subtract`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    id: BankAccountId,
    limit: Money,
    balance: Money,
}

impl BankAccount {
    /// Limit given to accounts opened without one.
    pub const DEFAULT_LIMIT: Money = Money::yens(100_000);

    /// Opens an account with the default limit and a zero yen balance.
    #[must_use]
    pub const fn new(id: BankAccountId) -> Self {
        Self {
            id,
            limit: Self::DEFAULT_LIMIT,
            balance: Money::zero(CurrencyCode::JPY),
        }
    }

    /// Opens an account with an explicit limit and opening balance.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyMismatch` if limit and balance differ in currency,
    /// `InvalidAmount` for a negative balance, and `LimitOver` if the balance
    /// exceeds the limit.
    pub fn create(
        id: BankAccountId,
        limit: Money,
        balance: Money,
    ) -> Result<Self, BankAccountError> {
        if balance.is_negative() {
            return Err(BankAccountError::InvalidAmount);
        }
        match limit.try_cmp(&balance) {
            Ok(Ordering::Less) => Err(BankAccountError::LimitOver),
            Ok(_) => Ok(Self { id, limit, balance }),
            Err(_) => Err(mismatch(limit, balance)),
        }
    }

    /// The account identifier.
    #[must_use]
    pub const fn id(&self) -> BankAccountId {
        self.id
    }

    /// The maximum balance.
    #[must_use]
    pub const fn limit(&self) -> Money {
        self.limit
    }

    /// The current balance.
    #[must_use]
    pub const fn balance(&self) -> Money {
        self.balance
    }

    /// True iff `limit >= balance + amount`.
    #[must_use]
    pub fn can_add(&self, amount: Money) -> bool {
        self.added(amount).is_ok()
    }

    /// Returns a copy with `amount` deposited.
    ///
    /// # Errors
    ///
    /// Returns `LimitOver` if the limit would be exceeded, `InvalidAmount`
    /// for a negative amount, `CurrencyMismatch` for a foreign currency.
    pub fn add(&self, amount: Money) -> Result<Self, BankAccountError> {
        let balance = self.added(amount)?;
        Ok(Self { balance, ..*self })
    }

    /// True iff `balance - amount >= 0`.
    #[must_use]
    pub fn can_subtract(&self, amount: Money) -> bool {
        self.subtracted(amount).is_ok()
    }

    /// Returns a copy with `amount` withdrawn.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` if the balance would drop below zero,
    /// `InvalidAmount` for a negative amount, `CurrencyMismatch` for a
    /// foreign currency.
    pub fn subtract(&self, amount: Money) -> Result<Self, BankAccountError> {
        let balance = self.subtracted(amount)?;
        Ok(Self { balance, ..*self })
    }

    fn added(&self, amount: Money) -> Result<Money, BankAccountError> {
        self.validate(amount)?;
        let balance = self
            .balance
            .checked_add(amount)
            .map_err(|_| BankAccountError::LimitOver)?;
        match self.limit.try_cmp(&balance) {
            Ok(Ordering::Less) | Err(_) => Err(BankAccountError::LimitOver),
            Ok(_) => Ok(balance),
        }
    }

    fn subtracted(&self, amount: Money) -> Result<Money, BankAccountError> {
        self.validate(amount)?;
        match self.balance.checked_sub(amount) {
            Ok(balance) if !balance.is_negative() => Ok(balance),
            Ok(_) | Err(MoneyError::Overflow) => Err(BankAccountError::InsufficientFunds),
            Err(_) => Err(mismatch(self.balance, amount)),
        }
    }

    fn validate(&self, amount: Money) -> Result<(), BankAccountError> {
        if amount.currency() != self.balance.currency() {
            return Err(mismatch(self.balance, amount));
        }
        if amount.is_negative() {
            return Err(BankAccountError::InvalidAmount);
        }
        Ok(())
    }
}

fn mismatch(expected: Money, actual: Money) -> BankAccountError {
    BankAccountError::CurrencyMismatch {
        expected: expected.currency(),
        actual: actual.currency(),
    }
}
