//! Application services: command decisions, replay and the per-account
//! worker runtime.

pub mod command_handlers;
pub mod config;
pub mod error;
pub mod query_handlers;
pub mod registry;
pub mod worker;
