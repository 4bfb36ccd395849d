//! Event journals for the Tally ledger.
//!
//! `PgEventRepository` is the durable journal; `InMemoryEventRepository`
//! backs ephemeral runs and tests.

pub mod in_memory_event_repository;
pub mod pg_event_repository;
