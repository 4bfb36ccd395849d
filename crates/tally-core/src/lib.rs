//! Tally Core: shared event-sourcing abstractions.
//!
//! This crate defines the traits and types every bounded context of the
//! ledger builds on: the aggregate fold, commands, events, the event journal
//! and a clock. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod repository;
