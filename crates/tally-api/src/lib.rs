//! Tally ledger HTTP API.
//!
//! Exposes the bank account commands over JSON. Every request is routed to
//! the single worker that owns the addressed account.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod supervision;

use axum::Router;

use crate::state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/accounts", routes::accounts::router())
        .with_state(state)
}
