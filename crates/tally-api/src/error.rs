//! Tally API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tally_account::application::error::AccountError;
use tally_account::domain::errors::BankAccountError;
use tally_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer error that implements `IntoResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// The account answered with a `Failed` reply.
    Rejected(BankAccountError),
    /// The command never produced a reply, or the journal failed.
    Account(AccountError),
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        Self::Account(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Account(AccountError::Domain(err))
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Rejected(rejection) => (StatusCode::UNPROCESSABLE_ENTITY, rejection.code()),
            Self::Account(err) => match err {
                AccountError::Domain(DomainError::AggregateNotFound(_)) => {
                    (StatusCode::NOT_FOUND, "account_not_found")
                }
                AccountError::Domain(DomainError::ConcurrencyConflict { .. }) => {
                    (StatusCode::CONFLICT, "concurrency_conflict")
                }
                AccountError::Domain(DomainError::Validation(_)) => {
                    (StatusCode::BAD_REQUEST, "validation_error")
                }
                AccountError::Domain(DomainError::Infrastructure(_)) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
                }
                AccountError::Domain(DomainError::Corrupted { .. }) | AccountError::Fault(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "corrupted_journal")
                }
                AccountError::NoReply(_) => (StatusCode::CONFLICT, "command_not_applicable"),
                AccountError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "reply_timeout"),
                AccountError::Unavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "account_unavailable")
                }
                AccountError::ReplyMismatch { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let message = match &self {
            Self::Rejected(rejection) => rejection.to_string(),
            Self::Account(err) => err.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %message, code = error_code, "request failed");
        }

        let body = ErrorBody {
            error: error_code,
            message,
        };

        (status, Json(body)).into_response()
    }
}
