//! Domain rejections and replay faults for the Bank Account context.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::account::BankAccountId;
use super::money::CurrencyCode;

/// Expected, recoverable rejections of a cash movement. They are answered
/// with a `Failed` reply and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BankAccountError {
    /// The balance would rise above the account limit.
    #[error("limit over: the balance would exceed the account limit")]
    LimitOver,

    /// The balance would drop below zero.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// The amount is in a different currency than the account.
    #[error("currency {actual} does not match account currency {expected}")]
    CurrencyMismatch {
        /// Currency the account is kept in.
        expected: CurrencyCode,
        /// Currency of the offending amount.
        actual: CurrencyCode,
    },

    /// A negative amount was supplied.
    #[error("amount must not be negative")]
    InvalidAmount,
}

impl BankAccountError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::LimitOver => "limit_over",
            Self::InsufficientFunds => "insufficient_funds",
            Self::CurrencyMismatch { .. } => "currency_mismatch",
            Self::InvalidAmount => "invalid_amount",
        }
    }
}

/// A replayed event that does not fit the state it is applied to.
///
/// This is never a user error: it means the journal is corrupted or an
/// earlier decision emitted an event it should not have. Replay of the
/// account halts and the fault is escalated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionFault {
    /// The event kind is not accepted in the current state.
    #[error("illegal state transition on account {account_id}: {event_type} in state {state}")]
    IllegalTransition {
        /// The account being replayed.
        account_id: BankAccountId,
        /// Name of the state the event was applied to.
        state: &'static str,
        /// Type of the offending event.
        event_type: &'static str,
    },

    /// Applying the event would break `0 <= balance <= limit`.
    #[error("failed to apply {event_type} to account {account_id}: {source}")]
    InvariantViolated {
        /// The account being replayed.
        account_id: BankAccountId,
        /// Type of the offending event.
        event_type: &'static str,
        /// The rejection the account raised.
        #[source]
        source: BankAccountError,
    },
}
