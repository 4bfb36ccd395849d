//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tally_account::application::config::RuntimeConfig;

use crate::error::AppError;

/// Where account events are journaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistenceMode {
    /// `PostgreSQL`; survives restarts.
    #[default]
    Persistence,
    /// Process memory; lost on exit.
    Ephemeral,
}

impl FromStr for PersistenceMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "persistence" => Ok(Self::Persistence),
            "ephemeral" => Ok(Self::Ephemeral),
            other => Err(AppError::Config(format!(
                "PERSISTENCE_MODE must be `persistence` or `ephemeral`, got `{other}`"
            ))),
        }
    }
}

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Socket the server binds to.
    pub addr: SocketAddr,
    /// Journal backend.
    pub persistence_mode: PersistenceMode,
    /// Required in `Persistence` mode.
    pub database_url: Option<String>,
    /// Account worker settings.
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is malformed, or if
    /// `DATABASE_URL` is missing in persistence mode.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// an environment variable if it is set.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        let persistence_mode = match lookup("PERSISTENCE_MODE") {
            Some(raw) => raw.parse()?,
            None => PersistenceMode::default(),
        };
        let database_url = lookup("DATABASE_URL");
        if persistence_mode == PersistenceMode::Persistence && database_url.is_none() {
            return Err(AppError::Config(
                "DATABASE_URL environment variable must be set in persistence mode".to_string(),
            ));
        }

        let mailbox_capacity = parse_or(
            &lookup,
            "MAILBOX_CAPACITY",
            RuntimeConfig::DEFAULT_MAILBOX_CAPACITY,
        )?;
        if mailbox_capacity == 0 {
            return Err(AppError::Config(
                "MAILBOX_CAPACITY must be at least 1".to_string(),
            ));
        }
        let default_timeout_ms =
            u64::try_from(RuntimeConfig::DEFAULT_REPLY_TIMEOUT.as_millis()).unwrap_or(u64::MAX);
        let reply_timeout_ms: u64 = parse_or(&lookup, "REPLY_TIMEOUT_MS", default_timeout_ms)?;

        Ok(Self {
            addr,
            persistence_mode,
            database_url,
            runtime: RuntimeConfig {
                mailbox_capacity,
                reply_timeout: Duration::from_millis(reply_timeout_ms),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}
