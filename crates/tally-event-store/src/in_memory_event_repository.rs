//! In-memory implementation of the `EventRepository` trait.
//!
//! Events live only as long as the process. Used for the ephemeral
//! persistence mode and in tests.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::trace;
use uuid::Uuid;

use tally_core::error::DomainError;
use tally_core::repository::{EventRepository, EventStream, StoredEvent};

/// Process-local event journal.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    streams: RwLock<HashMap<Uuid, Vec<StoredEvent>>>,
}

impl InMemoryEventRepository {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events recorded for `aggregate_id`.
    pub fn event_count(&self, aggregate_id: Uuid) -> usize {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&aggregate_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    fn load_events(&self, aggregate_id: Uuid) -> EventStream<'_> {
        let snapshot = self
            .streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default();
        stream::iter(snapshot.into_iter().map(Ok)).boxed()
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
        let stream = streams.entry(aggregate_id).or_default();

        let actual = stream.last().map_or(0, |event| event.sequence_number);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        for (next, event) in (expected_version + 1..).zip(events) {
            if event.aggregate_id != aggregate_id || event.sequence_number != next {
                return Err(DomainError::Validation(format!(
                    "event {} does not continue stream {aggregate_id} at {next}",
                    event.event_id
                )));
            }
        }

        stream.extend_from_slice(events);
        trace!(%aggregate_id, count = events.len(), "appended events in memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use futures::TryStreamExt;

    use super::*;

    fn make_stored_event(aggregate_id: Uuid, sequence_number: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id,
            aggregate_type: "TestAggregate".to_string(),
            event_type: "test.event".to_string(),
            payload: serde_json::json!({"key": "value"}),
            sequence_number,
            correlation_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        }
    }

    async fn load(repo: &InMemoryEventRepository, aggregate_id: Uuid) -> Vec<StoredEvent> {
        repo.load_events(aggregate_id).try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn test_load_events_is_empty_for_unknown_aggregate() {
        let repo = InMemoryEventRepository::new();

        assert!(load(&repo, Uuid::new_v4()).await.is_empty());
    }

    #[tokio::test]
    async fn test_append_then_load_preserves_order() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let aggregate_id = Uuid::new_v4();
        let first = vec![make_stored_event(aggregate_id, 1), make_stored_event(aggregate_id, 2)];
        let second = vec![make_stored_event(aggregate_id, 3)];

        // Act
        repo.append_events(aggregate_id, 0, &first).await.unwrap();
        repo.append_events(aggregate_id, 2, &second).await.unwrap();

        // Assert
        let loaded = load(&repo, aggregate_id).await;
        let sequence: Vec<i64> = loaded.iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequence, vec![1, 2, 3]);
        assert_eq!(loaded[0], first[0]);
        assert_eq!(repo.event_count(aggregate_id), 3);
    }

    #[tokio::test]
    async fn test_stale_expected_version_is_a_conflict() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let aggregate_id = Uuid::new_v4();
        repo.append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 1)])
            .await
            .unwrap();

        // Act
        let result = repo
            .append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 1)])
            .await;

        // Assert
        match result {
            Err(DomainError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
        assert_eq!(repo.event_count(aggregate_id), 1);
    }

    #[tokio::test]
    async fn test_non_contiguous_batch_is_rejected_whole() {
        let repo = InMemoryEventRepository::new();
        let aggregate_id = Uuid::new_v4();
        let batch = vec![make_stored_event(aggregate_id, 1), make_stored_event(aggregate_id, 3)];

        let result = repo.append_events(aggregate_id, 0, &batch).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(repo.event_count(aggregate_id), 0);
    }

    #[tokio::test]
    async fn test_streams_are_isolated_per_aggregate() {
        let repo = InMemoryEventRepository::new();
        let agg_a = Uuid::new_v4();
        let agg_b = Uuid::new_v4();

        repo.append_events(agg_a, 0, &[make_stored_event(agg_a, 1)])
            .await
            .unwrap();

        assert_eq!(repo.event_count(agg_a), 1);
        assert!(load(&repo, agg_b).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_is_a_snapshot_and_restartable() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let aggregate_id = Uuid::new_v4();
        repo.append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 1)])
            .await
            .unwrap();
        let stream = repo.load_events(aggregate_id);

        // Act
        repo.append_events(aggregate_id, 1, &[make_stored_event(aggregate_id, 2)])
            .await
            .unwrap();
        let snapshot: Vec<StoredEvent> = stream.try_collect().await.unwrap();

        // Assert
        assert_eq!(snapshot.len(), 1);
        assert_eq!(load(&repo, aggregate_id).await.len(), 2);
    }
}
