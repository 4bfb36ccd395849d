//! Domain model for the Bank Account context.

pub mod account;
pub mod aggregates;
pub mod commands;
pub mod errors;
pub mod events;
pub mod money;
pub mod replies;
