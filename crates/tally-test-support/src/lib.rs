//! Shared test mocks and utilities for the Tally ledger.

mod clock;
mod repository;

pub use clock::{FixedClock, SteppingClock};
pub use repository::{
    EmptyEventRepository, FailingEventRepository, RecordingEventRepository,
    UnwritableEventRepository,
};
