//! Chat token balance routes
//!
//! The balance is read and debited through [`scripta_ledger::TokenLedger`];
//! a failed debit surfaces as 403 so the client can roll back its
//! optimistic decrement.

use axum::{
    extract::{Extension, State},
    Json,
};
use serde::Serialize;

use crate::{auth::AuthUser, error::ApiResult, state::AppState};

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub remaining: i64,
}

/// Current token balance for the caller
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<BalanceResponse>> {
    let remaining = state.ledger.peek(user.id).await?;
    Ok(Json(BalanceResponse { remaining }))
}

/// Consume one token. Fails with 403 when the balance is exhausted.
pub async fn use_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<BalanceResponse>> {
    let remaining = state.ledger.debit(user.id).await?;
    tracing::debug!(user_id = %user.id, remaining = remaining, "Token debited");
    Ok(Json(BalanceResponse { remaining }))
}
