//! Replies for the Bank Account context.
//!
//! Every command kind has its own reply type with a `Succeeded` and a
//! `Failed` variant. `BankAccountReply` carries any of them through the
//! driver's single reply channel.

use serde::Serialize;

use super::account::BankAccountId;
use super::errors::BankAccountError;
use super::money::Money;

/// Reply to `Create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CreateReply {
    /// The account was opened.
    Succeeded {
        /// The account identifier.
        account_id: BankAccountId,
    },
    /// The account could not be opened.
    Failed {
        /// The account identifier.
        account_id: BankAccountId,
        /// Why.
        error: BankAccountError,
    },
}

/// Reply to `DepositCash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DepositCashReply {
    /// The deposit was persisted.
    Succeeded {
        /// The account identifier.
        account_id: BankAccountId,
        /// The deposited amount.
        amount: Money,
    },
    /// The deposit was rejected.
    Failed {
        /// The account identifier.
        account_id: BankAccountId,
        /// Why.
        error: BankAccountError,
    },
}

/// Reply to `WithdrawCash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WithdrawCashReply {
    /// The withdrawal was persisted.
    Succeeded {
        /// The account identifier.
        account_id: BankAccountId,
        /// The withdrawn amount.
        amount: Money,
    },
    /// The withdrawal was rejected.
    Failed {
        /// The account identifier.
        account_id: BankAccountId,
        /// Why.
        error: BankAccountError,
    },
}

/// Reply to `GetBalance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GetBalanceReply {
    /// The current balance.
    Succeeded {
        /// The account identifier.
        account_id: BankAccountId,
        /// The balance at decision time.
        balance: Money,
    },
    /// The balance could not be read.
    Failed {
        /// The account identifier.
        account_id: BankAccountId,
        /// Why.
        error: BankAccountError,
    },
}

/// Reply to `Stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StopReply {
    /// The worker will stop after this reply.
    Succeeded {
        /// The account identifier.
        account_id: BankAccountId,
    },
    /// The worker keeps running.
    Failed {
        /// The account identifier.
        account_id: BankAccountId,
        /// Why.
        error: BankAccountError,
    },
}

/// Any reply produced by the command handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BankAccountReply {
    /// Reply to `Create`.
    Create(CreateReply),
    /// Reply to `DepositCash`.
    DepositCash(DepositCashReply),
    /// Reply to `WithdrawCash`.
    WithdrawCash(WithdrawCashReply),
    /// Reply to `GetBalance`.
    GetBalance(GetBalanceReply),
    /// Reply to `Stop`.
    Stop(StopReply),
}

impl BankAccountReply {
    /// The account the reply is about.
    #[must_use]
    pub fn account_id(&self) -> BankAccountId {
        match self {
            Self::Create(
                CreateReply::Succeeded { account_id } | CreateReply::Failed { account_id, .. },
            )
            | Self::DepositCash(
                DepositCashReply::Succeeded { account_id, .. }
                | DepositCashReply::Failed { account_id, .. },
            )
            | Self::WithdrawCash(
                WithdrawCashReply::Succeeded { account_id, .. }
                | WithdrawCashReply::Failed { account_id, .. },
            )
            | Self::GetBalance(
                GetBalanceReply::Succeeded { account_id, .. }
                | GetBalanceReply::Failed { account_id, .. },
            )
            | Self::Stop(
                StopReply::Succeeded { account_id } | StopReply::Failed { account_id, .. },
            ) => *account_id,
        }
    }

    /// The rejection carried by a `Failed` reply.
    #[must_use]
    pub fn error(&self) -> Option<BankAccountError> {
        match self {
            Self::Create(CreateReply::Failed { error, .. })
            | Self::DepositCash(DepositCashReply::Failed { error, .. })
            | Self::WithdrawCash(WithdrawCashReply::Failed { error, .. })
            | Self::GetBalance(GetBalanceReply::Failed { error, .. })
            | Self::Stop(StopReply::Failed { error, .. }) => Some(*error),
            _ => None,
        }
    }

    /// True for every `Succeeded` reply.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.error().is_none()
    }

    /// True when the worker must terminate after sending this reply.
    #[must_use]
    pub fn stops_instance(&self) -> bool {
        matches!(self, Self::Stop(StopReply::Succeeded { .. }))
    }

    /// Short reply name for logs.
    #[must_use]
    pub fn reply_type(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::DepositCash(_) => "deposit_cash",
            Self::WithdrawCash(_) => "withdraw_cash",
            Self::GetBalance(_) => "get_balance",
            Self::Stop(_) => "stop",
        }
    }
}

macro_rules! reply_conversions {
    ($($variant:ident => $reply:ty),+ $(,)?) => {
        $(
            impl From<$reply> for BankAccountReply {
                fn from(reply: $reply) -> Self {
                    Self::$variant(reply)
                }
            }

            impl TryFrom<BankAccountReply> for $reply {
                type Error = BankAccountReply;

                fn try_from(reply: BankAccountReply) -> Result<Self, Self::Error> {
                    match reply {
                        BankAccountReply::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

reply_conversions! {
    Create => CreateReply,
    DepositCash => DepositCashReply,
    WithdrawCash => WithdrawCashReply,
    GetBalance => GetBalanceReply,
    Stop => StopReply,
}
