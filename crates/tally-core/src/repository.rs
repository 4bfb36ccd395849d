//! Event journal abstraction.

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::DomainEvent;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Journal tag: the kind of aggregate, e.g. `BankAccount`.
    pub aggregate_type: String,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate stream, starting at 1.
    pub sequence_number: i64,
    /// Correlation ID of the command that produced the event.
    pub correlation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

impl StoredEvent {
    /// Wraps a domain event for appending at `sequence_number`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload cannot be
    /// serialized.
    pub fn encode<E: DomainEvent>(
        event: &E,
        sequence_number: i64,
        correlation_id: Uuid,
    ) -> Result<Self, DomainError> {
        let payload = serde_json::to_value(event)
            .map_err(|e| DomainError::Infrastructure(format!("event serialization failed: {e}")))?;
        Ok(Self {
            event_id: Uuid::now_v7(),
            aggregate_id: event.aggregate_id(),
            aggregate_type: event.aggregate_type().to_owned(),
            event_type: event.event_type().to_owned(),
            payload,
            sequence_number,
            correlation_id,
            occurred_at: event.occurred_at(),
        })
    }

    /// Decodes the payload back into a domain event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Corrupted` if the payload does not deserialize,
    /// or if its type or aggregate tag disagrees with what was recorded.
    pub fn decode<E: DomainEvent>(&self) -> Result<E, DomainError> {
        let corrupted = |reason: String| DomainError::Corrupted {
            aggregate_id: self.aggregate_id,
            sequence_number: self.sequence_number,
            reason,
        };
        let event: E = serde_json::from_value(self.payload.clone())
            .map_err(|e| corrupted(format!("event deserialization failed: {e}")))?;
        if event.event_type() != self.event_type {
            return Err(corrupted(format!(
                "recorded type {} does not match payload type {}",
                self.event_type,
                event.event_type()
            )));
        }
        if event.aggregate_type() != self.aggregate_type {
            return Err(corrupted(format!(
                "recorded aggregate tag {} does not match {}",
                self.aggregate_type,
                event.aggregate_type()
            )));
        }
        Ok(event)
    }
}

/// Ordered stream of stored events for one aggregate.
pub type EventStream<'a> = BoxStream<'a, Result<StoredEvent, DomainError>>;

/// Journal trait for loading and appending domain events.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Lazily streams all events of an aggregate in append order. Calling it
    /// again restarts from the first event.
    fn load_events(&self, aggregate_id: Uuid) -> EventStream<'_>;

    /// Append new events to an aggregate stream with optimistic concurrency.
    /// `expected_version` is the last known sequence number. The call only
    /// returns `Ok` once the events are durable for this journal.
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;
}
