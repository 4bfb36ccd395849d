//! Commands for the Bank Account context.

use tally_core::command::Command;
use uuid::Uuid;

use super::account::BankAccountId;
use super::money::Money;

/// Commands accepted by a bank account aggregate.
///
/// Each targets the account it is addressed to; the reply destination travels
/// next to the command in the driver's envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankAccountCommand {
    /// Open the account.
    Create {
        /// The account identifier.
        account_id: BankAccountId,
        /// The account limit.
        limit: Money,
        /// The opening balance.
        balance: Money,
    },
    /// Deposit cash.
    DepositCash {
        /// The account identifier.
        account_id: BankAccountId,
        /// The amount to deposit.
        amount: Money,
    },
    /// Withdraw cash.
    WithdrawCash {
        /// The account identifier.
        account_id: BankAccountId,
        /// The amount to withdraw.
        amount: Money,
    },
    /// Read the current balance.
    GetBalance {
        /// The account identifier.
        account_id: BankAccountId,
    },
    /// Stop the worker that owns the account.
    Stop {
        /// The account identifier.
        account_id: BankAccountId,
    },
}

impl BankAccountCommand {
    /// The typed account identifier.
    #[must_use]
    pub const fn account_id(&self) -> BankAccountId {
        match self {
            Self::Create { account_id, .. }
            | Self::DepositCash { account_id, .. }
            | Self::WithdrawCash { account_id, .. }
            | Self::GetBalance { account_id }
            | Self::Stop { account_id } => *account_id,
        }
    }

    /// Kind of reply the command is answered with, as in
    /// `BankAccountReply::reply_type`.
    #[must_use]
    pub const fn reply_type(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::DepositCash { .. } => "deposit_cash",
            Self::WithdrawCash { .. } => "withdraw_cash",
            Self::GetBalance { .. } => "get_balance",
            Self::Stop { .. } => "stop",
        }
    }
}

impl Command for BankAccountCommand {
    fn command_type(&self) -> &'static str {
        match self {
            Self::Create { .. } => "bank_account.create",
            Self::DepositCash { .. } => "bank_account.deposit_cash",
            Self::WithdrawCash { .. } => "bank_account.withdraw_cash",
            Self::GetBalance { .. } => "bank_account.get_balance",
            Self::Stop { .. } => "bank_account.stop",
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.account_id().as_uuid()
    }
}
