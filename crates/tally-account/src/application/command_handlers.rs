//! Command handler for the Bank Account context.
//!
//! `decide` is the pure decision half of the aggregate: given the current
//! state and one command it says what to persist and what to answer. It never
//! blocks and never touches the journal; the worker carries the decision out.

use tally_core::clock::Clock;

use crate::domain::account::BankAccount;
use crate::domain::aggregates::AggregateState;
use crate::domain::commands::BankAccountCommand;
use crate::domain::events::{BankAccountEvent, CashDeposited, CashWithdrew, Created};
use crate::domain::replies::{
    BankAccountReply, CreateReply, DepositCashReply, GetBalanceReply, StopReply,
    WithdrawCashReply,
};

/// Outcome of deciding one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Append `event`; send `reply` only once the append is acknowledged.
    PersistAndReply {
        /// The event to persist.
        event: BankAccountEvent,
        /// The reply to send after persistence.
        reply: BankAccountReply,
    },
    /// The command is rejected; nothing is persisted.
    RejectAndReply(BankAccountReply),
    /// The command only reads state; nothing is persisted.
    ReadAndReply(BankAccountReply),
    /// The command does not apply to the current state. No event, no reply.
    Unhandled,
}

impl Decision {
    /// The event to persist, if any.
    #[must_use]
    pub fn event(&self) -> Option<&BankAccountEvent> {
        match self {
            Self::PersistAndReply { event, .. } => Some(event),
            Self::RejectAndReply(_) | Self::ReadAndReply(_) | Self::Unhandled => None,
        }
    }

    /// The reply to send, if any.
    #[must_use]
    pub fn reply(&self) -> Option<&BankAccountReply> {
        match self {
            Self::PersistAndReply { reply, .. }
            | Self::RejectAndReply(reply)
            | Self::ReadAndReply(reply) => Some(reply),
            Self::Unhandled => None,
        }
    }
}

/// Decides `command` against `state`. Events are stamped with `clock`.
///
/// Rules, first match wins:
/// 1. `Uninitialized` + `Create` persists `Created`.
/// 2. `Active` + `DepositCash` persists `CashDeposited` if the account can
///    take the amount, otherwise rejects.
/// 3. `Active` + `WithdrawCash` persists `CashWithdrew` if the account can
///    give the amount, otherwise rejects.
/// 4. `Active` + `GetBalance` replies with the balance.
/// 5. `Active` + `Stop` acknowledges; the worker terminates afterwards.
/// 6. Anything else is `Unhandled`.
#[must_use]
pub fn decide(state: &AggregateState, command: &BankAccountCommand, clock: &dyn Clock) -> Decision {
    match (state, command) {
        (
            AggregateState::Uninitialized(_),
            &BankAccountCommand::Create {
                account_id,
                limit,
                balance,
            },
        ) => match BankAccount::create(account_id, limit, balance) {
            Ok(_) => Decision::PersistAndReply {
                event: BankAccountEvent::Created(Created {
                    account_id,
                    limit,
                    balance,
                    occurred_at: clock.now(),
                }),
                reply: CreateReply::Succeeded { account_id }.into(),
            },
            Err(error) => {
                Decision::RejectAndReply(CreateReply::Failed { account_id, error }.into())
            }
        },
        (
            AggregateState::Active { account, .. },
            &BankAccountCommand::DepositCash { account_id, amount },
        ) => match account.add(amount) {
            Ok(_) => Decision::PersistAndReply {
                event: BankAccountEvent::CashDeposited(CashDeposited {
                    account_id,
                    amount,
                    occurred_at: clock.now(),
                }),
                reply: DepositCashReply::Succeeded { account_id, amount }.into(),
            },
            Err(error) => {
                Decision::RejectAndReply(DepositCashReply::Failed { account_id, error }.into())
            }
        },
        (
            AggregateState::Active { account, .. },
            &BankAccountCommand::WithdrawCash { account_id, amount },
        ) => match account.subtract(amount) {
            Ok(_) => Decision::PersistAndReply {
                event: BankAccountEvent::CashWithdrew(CashWithdrew {
                    account_id,
                    amount,
                    occurred_at: clock.now(),
                }),
                reply: WithdrawCashReply::Succeeded { account_id, amount }.into(),
            },
            Err(error) => {
                Decision::RejectAndReply(WithdrawCashReply::Failed { account_id, error }.into())
            }
        },
        (
            AggregateState::Active { account, .. },
            &BankAccountCommand::GetBalance { account_id },
        ) => Decision::ReadAndReply(
            GetBalanceReply::Succeeded {
                account_id,
                balance: account.balance(),
            }
            .into(),
        ),
        (AggregateState::Active { .. }, &BankAccountCommand::Stop { account_id }) => {
            Decision::ReadAndReply(StopReply::Succeeded { account_id }.into())
        }
        (
            AggregateState::Uninitialized(_),
            BankAccountCommand::DepositCash { .. }
            | BankAccountCommand::WithdrawCash { .. }
            | BankAccountCommand::GetBalance { .. }
            | BankAccountCommand::Stop { .. },
        )
        | (AggregateState::Active { .. }, BankAccountCommand::Create { .. }) => Decision::Unhandled,
    }
}
