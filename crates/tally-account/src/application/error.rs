//! Errors surfaced by the account runtime.

use std::time::Duration;

use tally_core::error::DomainError;
use thiserror::Error;

use crate::domain::account::BankAccountId;
use crate::domain::errors::TransitionFault;

/// Failures of the account runtime, as opposed to domain rejections, which
/// arrive as `Failed` replies.
#[derive(Debug, Clone, Error)]
pub enum AccountError {
    /// The journal failed or returned unusable data.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Replay hit an event that does not fit the state. Fatal for the account.
    #[error(transparent)]
    Fault(#[from] TransitionFault),

    /// The command did not apply to the account's state and was dropped
    /// without an answer.
    #[error("command for account {0} was not answered")]
    NoReply(BankAccountId),

    /// No reply arrived in time.
    #[error("no reply from account {account_id} within {timeout:?}")]
    Timeout {
        /// The addressed account.
        account_id: BankAccountId,
        /// How long the caller waited.
        timeout: Duration,
    },

    /// The worker owning the account is not running, or stopped before it
    /// decided the command.
    #[error("account worker {0} is not running")]
    Unavailable(BankAccountId),

    /// A reply of the wrong kind came back.
    #[error("expected a {expected} reply, got {actual}")]
    ReplyMismatch {
        /// The kind the caller asked for.
        expected: &'static str,
        /// The kind that arrived.
        actual: &'static str,
    },
}
