//! Tally API server entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tally_account::application::registry::AccountRegistry;
use tally_api::config::{AppConfig, PersistenceMode};
use tally_api::error::AppError;
use tally_api::state::AppState;
use tally_api::supervision::escalate_faults;
use tally_core::clock::{MonotonicClock, SystemClock};
use tally_core::repository::EventRepository;
use tally_event_store::in_memory_event_repository::InMemoryEventRepository;
use tally_event_store::pg_event_repository::PgEventRepository;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Tally API server");

    let config = AppConfig::from_env()?;

    let event_repository: Arc<dyn EventRepository> = match config.persistence_mode {
        PersistenceMode::Persistence => {
            let database_url = config.database_url.as_deref().ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable must be set".to_string())
            })?;
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            Arc::new(PgEventRepository::new(pool))
        }
        PersistenceMode::Ephemeral => {
            tracing::warn!("ephemeral persistence: account events are lost on exit");
            Arc::new(InMemoryEventRepository::new())
        }
    };

    let registry = Arc::new(AccountRegistry::new(
        Arc::clone(&event_repository),
        Arc::new(MonotonicClock::new(SystemClock)),
        config.runtime.clone(),
    ));

    tokio::spawn(escalate_faults(registry.subscribe_faults()));

    let app = tally_api::build_router(AppState::new(Arc::clone(&registry), event_repository))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let stopped = registry.shutdown_all().await;
    tracing::info!(stopped, "account workers stopped, exiting");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
