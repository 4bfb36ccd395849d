//! `PostgreSQL` implementation of the `EventRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use tally_core::error::DomainError;
use tally_core::repository::{EventRepository, EventStream, StoredEvent};

const LOAD_EVENTS: &str = r"
SELECT event_id, aggregate_id, aggregate_type, event_type, payload, sequence_number,
       correlation_id, occurred_at
FROM domain_events
WHERE aggregate_id = $1
ORDER BY sequence_number ASC
";

const CURRENT_VERSION: &str =
    "SELECT COALESCE(MAX(sequence_number), 0) FROM domain_events WHERE aggregate_id = $1";

const INSERT_EVENT: &str = r"
INSERT INTO domain_events
    (event_id, aggregate_id, aggregate_type, event_type, payload, sequence_number,
     correlation_id, occurred_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
";

#[derive(sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    aggregate_id: Uuid,
    aggregate_type: String,
    event_type: String,
    payload: serde_json::Value,
    sequence_number: i64,
    correlation_id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            aggregate_type: row.aggregate_type,
            event_type: row.event_type,
            payload: row.payload,
            sequence_number: row.sequence_number,
            correlation_id: row.correlation_id,
            occurred_at: row.occurred_at,
        }
    }
}

fn infrastructure(err: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("event store: {err}"))
}

/// PostgreSQL-backed event repository.
#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    fn load_events(&self, aggregate_id: Uuid) -> EventStream<'_> {
        sqlx::query_as::<_, EventRow>(LOAD_EVENTS)
            .bind(aggregate_id)
            .fetch(&self.pool)
            .map_ok(StoredEvent::from)
            .map_err(|err| infrastructure(&err))
            .boxed()
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| infrastructure(&e))?;

        let actual: i64 = sqlx::query_scalar(CURRENT_VERSION)
            .bind(aggregate_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| infrastructure(&e))?;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        for event in events {
            sqlx::query(INSERT_EVENT)
                .bind(event.event_id)
                .bind(aggregate_id)
                .bind(&event.aggregate_type)
                .bind(&event.event_type)
                .bind(&event.payload)
                .bind(event.sequence_number)
                .bind(event.correlation_id)
                .bind(event.occurred_at)
                .execute(&mut *tx)
                .await
                .map_err(|err| match &err {
                    // A concurrent writer committed the same sequence number
                    // after our version check.
                    sqlx::Error::Database(db) if db.is_unique_violation() => {
                        DomainError::ConcurrencyConflict {
                            aggregate_id,
                            expected: expected_version,
                            actual: expected_version + 1,
                        }
                    }
                    _ => infrastructure(&err),
                })?;
        }

        tx.commit().await.map_err(|e| infrastructure(&e))?;
        debug!(
            %aggregate_id,
            expected_version,
            count = events.len(),
            "appended events"
        );
        Ok(())
    }
}
