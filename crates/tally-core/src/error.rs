//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type shared by journals and command drivers.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// A stored event could not be turned back into a domain event.
    #[error("corrupted event {sequence_number} of aggregate {aggregate_id}: {reason}")]
    Corrupted {
        /// The aggregate whose stream is corrupted.
        aggregate_id: Uuid,
        /// Position of the offending event.
        sequence_number: i64,
        /// What was wrong with it.
        reason: String,
    },
}
