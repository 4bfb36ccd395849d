//! Aggregate state for the Bank Account context.

use tally_core::aggregate::AggregateRoot;
use tally_core::event::DomainEvent;
use uuid::Uuid;

use super::account::{BankAccount, BankAccountId};
use super::errors::TransitionFault;
use super::events::BankAccountEvent;

/// State of one bank account aggregate.
///
/// Starts `Uninitialized` and becomes `Active` on the first `Created` event.
/// It never reverts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateState {
    /// No account has been opened under this id yet.
    Uninitialized(BankAccountId),
    /// The account is open.
    Active {
        /// The aggregate identifier.
        id: BankAccountId,
        /// Current snapshot of the account.
        account: BankAccount,
    },
}

impl AggregateState {
    /// The empty state an aggregate is replayed from.
    #[must_use]
    pub const fn new(id: BankAccountId) -> Self {
        Self::Uninitialized(id)
    }

    /// The aggregate identifier.
    #[must_use]
    pub const fn id(&self) -> BankAccountId {
        match self {
            Self::Uninitialized(id) | Self::Active { id, .. } => *id,
        }
    }

    /// The account, once opened.
    #[must_use]
    pub const fn account(&self) -> Option<&BankAccount> {
        match self {
            Self::Uninitialized(_) => None,
            Self::Active { account, .. } => Some(account),
        }
    }

    /// Short state name for logs and faults.
    #[must_use]
    pub const fn state_name(&self) -> &'static str {
        match self {
            Self::Uninitialized(_) => "uninitialized",
            Self::Active { .. } => "active",
        }
    }

    /// Folds one event into the state.
    ///
    /// # Errors
    ///
    /// Returns `TransitionFault::IllegalTransition` for an event the state
    /// does not accept and `TransitionFault::InvariantViolated` if the event
    /// would break the balance invariant. Both are fatal for the aggregate.
    pub fn apply_event(&self, event: &BankAccountEvent) -> Result<Self, TransitionFault> {
        let violated = |source| TransitionFault::InvariantViolated {
            account_id: self.id(),
            event_type: event.event_type(),
            source,
        };
        match (self, event) {
            (Self::Uninitialized(_), BankAccountEvent::Created(created)) => {
                let account =
                    BankAccount::create(created.account_id, created.limit, created.balance)
                        .map_err(violated)?;
                Ok(Self::Active {
                    id: created.account_id,
                    account,
                })
            }
            (Self::Active { id, account }, BankAccountEvent::CashDeposited(deposited)) => {
                let account = account.add(deposited.amount).map_err(violated)?;
                Ok(Self::Active { id: *id, account })
            }
            (Self::Active { id, account }, BankAccountEvent::CashWithdrew(withdrew)) => {
                let account = account.subtract(withdrew.amount).map_err(violated)?;
                Ok(Self::Active { id: *id, account })
            }
            (
                Self::Uninitialized(_),
                BankAccountEvent::CashDeposited(_) | BankAccountEvent::CashWithdrew(_),
            )
            | (Self::Active { .. }, BankAccountEvent::Created(_)) => {
                Err(TransitionFault::IllegalTransition {
                    account_id: self.id(),
                    state: self.state_name(),
                    event_type: event.event_type(),
                })
            }
        }
    }
}

impl AggregateRoot for AggregateState {
    type Event = BankAccountEvent;
    type Fault = TransitionFault;

    fn aggregate_id(&self) -> Uuid {
        self.id().as_uuid()
    }

    fn apply(&self, event: &Self::Event) -> Result<Self, Self::Fault> {
        self.apply_event(event)
    }
}
