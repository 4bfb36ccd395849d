//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Trait that all domain events implement.
///
/// Events are serialized with `serde_json` into the journal payload; the
/// round trip must be lossless for replay to reproduce the same state.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + std::fmt::Debug {
    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &'static str;

    /// Returns the kind of aggregate the event belongs to. Stored with every
    /// event as its journal tag.
    fn aggregate_type(&self) -> &'static str;

    /// Returns the aggregate this event belongs to.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the time the event was decided.
    fn occurred_at(&self) -> DateTime<Utc>;
}
