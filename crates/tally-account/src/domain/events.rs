//! Domain events for the Bank Account context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::event::DomainEvent;
use uuid::Uuid;

use super::account::BankAccountId;
use super::money::Money;

/// Event type name for `Created`.
pub const CREATED_EVENT_TYPE: &str = "bank_account.created";
/// Event type name for `CashDeposited`.
pub const CASH_DEPOSITED_EVENT_TYPE: &str = "bank_account.cash_deposited";
/// Event type name for `CashWithdrew`.
pub const CASH_WITHDREW_EVENT_TYPE: &str = "bank_account.cash_withdrew";

/// Emitted when an account is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    /// The account identifier.
    pub account_id: BankAccountId,
    /// The account limit.
    pub limit: Money,
    /// The opening balance.
    pub balance: Money,
    /// When the command was decided.
    pub occurred_at: DateTime<Utc>,
}

/// Emitted when cash is deposited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashDeposited {
    /// The account identifier.
    pub account_id: BankAccountId,
    /// The deposited amount.
    pub amount: Money,
    /// When the command was decided.
    pub occurred_at: DateTime<Utc>,
}

/// Emitted when cash is withdrawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashWithdrew {
    /// The account identifier.
    pub account_id: BankAccountId,
    /// The withdrawn amount.
    pub amount: Money,
    /// When the command was decided.
    pub occurred_at: DateTime<Utc>,
}

/// Events of the Bank Account context. Append-only once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankAccountEvent {
    /// The account has been opened.
    Created(Created),
    /// Cash has been deposited.
    CashDeposited(CashDeposited),
    /// Cash has been withdrawn.
    CashWithdrew(CashWithdrew),
}

impl BankAccountEvent {
    /// The typed account identifier.
    #[must_use]
    pub fn account_id(&self) -> BankAccountId {
        match self {
            Self::Created(payload) => payload.account_id,
            Self::CashDeposited(payload) => payload.account_id,
            Self::CashWithdrew(payload) => payload.account_id,
        }
    }
}

impl DomainEvent for BankAccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => CREATED_EVENT_TYPE,
            Self::CashDeposited(_) => CASH_DEPOSITED_EVENT_TYPE,
            Self::CashWithdrew(_) => CASH_WITHDREW_EVENT_TYPE,
        }
    }

    fn aggregate_type(&self) -> &'static str {
        BankAccountId::AGGREGATE_TYPE_NAME
    }

    fn aggregate_id(&self) -> Uuid {
        self.account_id().as_uuid()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::Created(payload) => payload.occurred_at,
            Self::CashDeposited(payload) => payload.occurred_at,
            Self::CashWithdrew(payload) => payload.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tally_core::repository::StoredEvent;

    #[test]
    fn test_stored_event_decodes_to_the_same_event() {
        // Arrange
        let account_id = BankAccountId::generate();
        let event = BankAccountEvent::CashDeposited(CashDeposited {
            account_id,
            amount: Money::yens(50_000),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        });
        let correlation_id = Uuid::new_v4();

        // Act
        let stored = StoredEvent::encode(&event, 2, correlation_id).unwrap();
        let decoded: BankAccountEvent = stored.decode().unwrap();

        // Assert
        assert_eq!(stored.aggregate_id, account_id.as_uuid());
        assert_eq!(stored.aggregate_type, "BankAccount");
        assert_eq!(stored.event_type, CASH_DEPOSITED_EVENT_TYPE);
        assert_eq!(stored.sequence_number, 2);
        assert_eq!(stored.correlation_id, correlation_id);
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_decode_rejects_mismatched_event_type() {
        // Arrange
        let event = BankAccountEvent::CashWithdrew(CashWithdrew {
            account_id: BankAccountId::generate(),
            amount: Money::yens(1),
            occurred_at: Utc::now(),
        });
        let mut stored = StoredEvent::encode(&event, 1, Uuid::new_v4()).unwrap();
        stored.event_type = CREATED_EVENT_TYPE.to_owned();

        // Act
        let result = stored.decode::<BankAccountEvent>();

        // Assert
        match result {
            Err(tally_core::error::DomainError::Corrupted {
                sequence_number, ..
            }) => assert_eq!(sequence_number, 1),
            other => panic!("expected Corrupted, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_foreign_aggregate_tag() {
        // Arrange
        let event = BankAccountEvent::CashDeposited(CashDeposited {
            account_id: BankAccountId::generate(),
            amount: Money::yens(1),
            occurred_at: Utc::now(),
        });
        let mut stored = StoredEvent::encode(&event, 1, Uuid::new_v4()).unwrap();
        stored.aggregate_type = "SavingsAccount".to_owned();

        // Act
        let result = stored.decode::<BankAccountEvent>();

        // Assert
        assert!(matches!(
            result,
            Err(tally_core::error::DomainError::Corrupted { .. })
        ));
    }
}
