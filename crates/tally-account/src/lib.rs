//! Tally: Bank Account bounded context.
//!
//! Decides which cash movements are legal for an account, records them as
//! events and rebuilds account state by replaying those events. The
//! application layer drives one worker per account so commands for the same
//! account are never decided concurrently.

pub mod application;
pub mod domain;
