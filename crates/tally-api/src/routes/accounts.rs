//! Routes for the Bank Account context.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use tally_account::application::query_handlers::{self, AccountView};
use tally_account::domain::account::{BankAccount, BankAccountId};
use tally_account::domain::commands::BankAccountCommand;
use tally_account::domain::money::Money;
use tally_account::domain::replies::{
    CreateReply, DepositCashReply, GetBalanceReply, StopReply, WithdrawCashReply,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAccountRequest {
    /// Generated when absent.
    pub account_id: Option<BankAccountId>,
    /// Defaults to 100000 JPY.
    pub limit: Option<Money>,
    /// Defaults to zero in the limit's currency.
    pub balance: Option<Money>,
}

/// Response body for POST /.
#[derive(Debug, Serialize)]
pub struct AccountCreatedResponse {
    /// The opened account.
    pub account_id: BankAccountId,
}

/// Response body for deposits and withdrawals.
#[derive(Debug, Serialize)]
pub struct CashMovementResponse {
    /// The account.
    pub account_id: BankAccountId,
    /// The amount moved.
    pub amount: Money,
}

/// Response body for GET /{id}/balance.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// The account.
    pub account_id: BankAccountId,
    /// The balance when the request was decided.
    pub balance: Money,
}

/// Response body for POST /{id}/stop.
#[derive(Debug, Serialize)]
pub struct StopResponse {
    /// The account whose worker stopped.
    pub account_id: BankAccountId,
}

/// POST /
#[instrument(skip_all)]
async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountCreatedResponse>), ApiError> {
    let account_id = request.account_id.unwrap_or_else(BankAccountId::generate);
    let limit = request.limit.unwrap_or(BankAccount::DEFAULT_LIMIT);
    let balance = request
        .balance
        .unwrap_or_else(|| Money::zero(limit.currency()));

    info!(%account_id, %limit, %balance, "handling create command");

    let reply = state
        .registry
        .ask::<CreateReply>(BankAccountCommand::Create {
            account_id,
            limit,
            balance,
        })
        .await?;
    match reply {
        CreateReply::Succeeded { account_id } => Ok((
            StatusCode::CREATED,
            Json(AccountCreatedResponse { account_id }),
        )),
        CreateReply::Failed { error, .. } => Err(ApiError::Rejected(error)),
    }
}

/// POST /{id}/deposits
#[instrument(skip_all, fields(%account_id))]
async fn deposit_cash(
    State(state): State<AppState>,
    Path(account_id): Path<BankAccountId>,
    Json(amount): Json<Money>,
) -> Result<Json<CashMovementResponse>, ApiError> {
    info!(%amount, "handling deposit_cash command");

    let reply = state
        .registry
        .ask::<DepositCashReply>(BankAccountCommand::DepositCash { account_id, amount })
        .await?;
    match reply {
        DepositCashReply::Succeeded { account_id, amount } => {
            Ok(Json(CashMovementResponse { account_id, amount }))
        }
        DepositCashReply::Failed { error, .. } => Err(ApiError::Rejected(error)),
    }
}

/// POST /{id}/withdrawals
#[instrument(skip_all, fields(%account_id))]
async fn withdraw_cash(
    State(state): State<AppState>,
    Path(account_id): Path<BankAccountId>,
    Json(amount): Json<Money>,
) -> Result<Json<CashMovementResponse>, ApiError> {
    info!(%amount, "handling withdraw_cash command");

    let reply = state
        .registry
        .ask::<WithdrawCashReply>(BankAccountCommand::WithdrawCash { account_id, amount })
        .await?;
    match reply {
        WithdrawCashReply::Succeeded { account_id, amount } => {
            Ok(Json(CashMovementResponse { account_id, amount }))
        }
        WithdrawCashReply::Failed { error, .. } => Err(ApiError::Rejected(error)),
    }
}

/// GET /{id}/balance
#[instrument(skip_all, fields(%account_id))]
async fn get_balance(
    State(state): State<AppState>,
    Path(account_id): Path<BankAccountId>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let reply = state
        .registry
        .ask::<GetBalanceReply>(BankAccountCommand::GetBalance { account_id })
        .await?;
    match reply {
        GetBalanceReply::Succeeded {
            account_id,
            balance,
        } => Ok(Json(BalanceResponse {
            account_id,
            balance,
        })),
        GetBalanceReply::Failed { error, .. } => Err(ApiError::Rejected(error)),
    }
}

/// POST /{id}/stop
#[instrument(skip_all, fields(%account_id))]
async fn stop_account(
    State(state): State<AppState>,
    Path(account_id): Path<BankAccountId>,
) -> Result<Json<StopResponse>, ApiError> {
    info!("handling stop command");

    let reply = state
        .registry
        .ask::<StopReply>(BankAccountCommand::Stop { account_id })
        .await?;
    match reply {
        StopReply::Succeeded { account_id } => Ok(Json(StopResponse { account_id })),
        StopReply::Failed { error, .. } => Err(ApiError::Rejected(error)),
    }
}

/// GET /{id}
#[instrument(skip_all, fields(%account_id))]
async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<BankAccountId>,
) -> Result<Json<AccountView>, ApiError> {
    let view = query_handlers::get_account_by_id(account_id, &*state.event_repository).await?;
    Ok(Json(view))
}

/// Returns the router for the account context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_account))
        .route("/{id}", get(get_account))
        .route("/{id}/deposits", post(deposit_cash))
        .route("/{id}/withdrawals", post(withdraw_cash))
        .route("/{id}/balance", get(get_balance))
        .route("/{id}/stop", post(stop_account))
}
