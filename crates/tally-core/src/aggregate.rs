//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for aggregate states that reconstitute from event history.
///
/// An implementor is an immutable value: applying an event yields the next
/// state and leaves `self` untouched. `apply` must be deterministic and free
/// of side effects, so replaying the same history always yields the same
/// state.
pub trait AggregateRoot: Sized {
    /// The event type this aggregate consumes.
    type Event: DomainEvent;

    /// Raised when an event is not a legal transition from the current state.
    type Fault: std::error::Error;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Applies a single event, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns `Self::Fault` if the event does not fit the current state.
    fn apply(&self, event: &Self::Event) -> Result<Self, Self::Fault>;

    /// Folds `events` over `self` in order.
    ///
    /// # Errors
    ///
    /// Stops at the first event that faults and returns that fault.
    fn replay<'a, I>(self, events: I) -> Result<Self, Self::Fault>
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
    {
        events
            .into_iter()
            .try_fold(self, |state, event| state.apply(event))
    }
}
