//! Query handlers for the Bank Account context.
//!
//! Rebuilds account state from the journal and returns read-only views.

use futures::TryStreamExt;
use serde::Serialize;
use tally_core::error::DomainError;
use tally_core::repository::EventRepository;

use crate::application::error::AccountError;
use crate::domain::account::BankAccountId;
use crate::domain::aggregates::AggregateState;
use crate::domain::events::BankAccountEvent;
use crate::domain::money::Money;

/// Read-only view of a bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    /// The account identifier.
    pub account_id: BankAccountId,
    /// The account limit.
    pub limit: Money,
    /// The current balance.
    pub balance: Money,
    /// Current version (event count).
    pub version: i64,
}

/// Replays the journal of `account_id` from its first event.
///
/// Returns the resulting state and the sequence number of the last event
/// applied (0 for an empty stream).
///
/// # Errors
///
/// Returns `AccountError::Domain` if the journal fails, an event does not
/// decode, or sequence numbers are not contiguous from 1, and
/// `AccountError::Fault` if an event is an illegal transition.
pub async fn reconstitute(
    account_id: BankAccountId,
    repo: &dyn EventRepository,
) -> Result<(AggregateState, i64), AccountError> {
    let mut stream = repo.load_events(account_id.as_uuid());
    let mut state = AggregateState::new(account_id);
    let mut version = 0;
    while let Some(stored) = stream.try_next().await? {
        if stored.sequence_number != version + 1 {
            return Err(DomainError::Corrupted {
                aggregate_id: account_id.as_uuid(),
                sequence_number: stored.sequence_number,
                reason: format!("expected sequence number {}", version + 1),
            }
            .into());
        }
        let event: BankAccountEvent = stored.decode()?;
        state = state.apply_event(&event)?;
        version = stored.sequence_number;
    }
    Ok((state, version))
}

/// Retrieves an account by replaying its events.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` (wrapped) if the account was
/// never created, and whatever `reconstitute` returns otherwise.
pub async fn get_account_by_id(
    account_id: BankAccountId,
    repo: &dyn EventRepository,
) -> Result<AccountView, AccountError> {
    let (state, version) = reconstitute(account_id, repo).await?;
    let Some(account) = state.account() else {
        return Err(DomainError::AggregateNotFound(account_id.as_uuid()).into());
    };
    Ok(AccountView {
        account_id,
        limit: account.limit(),
        balance: account.balance(),
        version,
    })
}
