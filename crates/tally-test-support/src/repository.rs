//! Mock `EventRepository` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tally_core::error::DomainError;
use tally_core::repository::{EventRepository, EventStream, StoredEvent};
use uuid::Uuid;

fn connection_refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

/// Streams a fixed history from `load_events` and records every
/// `append_events` call, which always succeeds. Appended events are not
/// added to the history.
#[derive(Debug)]
pub struct RecordingEventRepository {
    history: Vec<StoredEvent>,
    appended: Mutex<Vec<(Uuid, i64, Vec<StoredEvent>)>>,
}

impl RecordingEventRepository {
    /// Creates a repository whose `load_events` streams `history`.
    #[must_use]
    pub fn new(history: Vec<StoredEvent>) -> Self {
        Self {
            history,
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all appends as
    /// `(aggregate_id, expected_version, events)`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<(Uuid, i64, Vec<StoredEvent>)> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRepository for RecordingEventRepository {
    fn load_events(&self, _aggregate_id: Uuid) -> EventStream<'_> {
        stream::iter(self.history.iter().cloned().map(Ok)).boxed()
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.to_vec()));
        Ok(())
    }
}

/// Streams no events and silently accepts appends. Useful for "account not
/// found" scenarios.
#[derive(Debug)]
pub struct EmptyEventRepository;

#[async_trait]
impl EventRepository for EmptyEventRepository {
    fn load_events(&self, _aggregate_id: Uuid) -> EventStream<'_> {
        stream::empty().boxed()
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Fails every load and every append with an infrastructure error.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    fn load_events(&self, _aggregate_id: Uuid) -> EventStream<'_> {
        stream::once(async { Err(connection_refused()) }).boxed()
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(connection_refused())
    }
}

/// Streams a fixed history but fails every append. Models a journal that
/// goes away after recovery.
#[derive(Debug)]
pub struct UnwritableEventRepository {
    history: Vec<StoredEvent>,
}

impl UnwritableEventRepository {
    /// Creates a repository whose `load_events` streams `history`.
    #[must_use]
    pub fn new(history: Vec<StoredEvent>) -> Self {
        Self { history }
    }
}

#[async_trait]
impl EventRepository for UnwritableEventRepository {
    fn load_events(&self, _aggregate_id: Uuid) -> EventStream<'_> {
        stream::iter(self.history.iter().cloned().map(Ok)).boxed()
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(connection_refused())
    }
}
