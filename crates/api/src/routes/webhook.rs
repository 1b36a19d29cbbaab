//! Payment provider webhook route
//!
//! The body is taken raw: the reconciler parses it itself so a malformed
//! payload maps to 400 rather than an axum rejection, and the callback
//! token is checked before anything is deserialized.

use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use scripta_ledger::Disposition;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

/// Handle a payment provider event delivery
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Json<Value>> {
    tracing::info!(body_len = body.len(), "Payment webhook received");

    let token = headers
        .get(CALLBACK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Payment webhook missing callback token header");
            ApiError::Unauthorized
        })?;

    let disposition = state.reconciler.handle_event(&body, token).await?;

    match &disposition {
        Disposition::Test => {
            tracing::info!("Payment webhook connectivity test acknowledged");
        }
        Disposition::Credited { package, remaining } => {
            tracing::info!(
                package = %package,
                remaining = remaining,
                "Payment webhook credited tokens"
            );
        }
        Disposition::SubscriptionActivated { subscription_id } => {
            tracing::info!(
                subscription_id = %subscription_id,
                "Payment webhook activated subscription"
            );
        }
        Disposition::Ignored { event } => {
            tracing::info!(event = %event, "Payment webhook event ignored");
        }
    }

    Ok(Json(json!({ "success": true })))
}
