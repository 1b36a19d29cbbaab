//! Subscription routes

use axum::{
    extract::{Extension, State},
    Json,
};
use serde::{Deserialize, Serialize};

use scripta_shared::Subscription;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    /// The newest active, unexpired subscription, if any
    pub current: Option<Subscription>,
    /// Full history, newest first
    pub history: Vec<Subscription>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyLicenseRequest {
    pub license_code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyLicenseResponse {
    pub license_code: String,
    /// Raw verification result from the payment provider
    pub result: serde_json::Value,
}

/// Current subscription status and history for the caller
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let current = state.subscriptions.current(user.id).await?;
    let history = state.subscriptions.history(user.id).await?;

    Ok(Json(SubscriptionResponse { current, history }))
}

/// Verify a license code against the payment provider
///
/// The code must belong to the caller; we never forward arbitrary codes
/// upstream.
pub async fn verify_license(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<VerifyLicenseRequest>,
) -> ApiResult<Json<VerifyLicenseResponse>> {
    let license_code = req.license_code.trim().to_string();
    if license_code.is_empty() {
        return Err(ApiError::Validation("license_code is required".to_string()));
    }

    let owned: Option<(uuid::Uuid,)> = sqlx::query_as(
        "SELECT id FROM subscriptions WHERE user_id = $1 AND license_code = $2",
    )
    .bind(user.id)
    .bind(&license_code)
    .fetch_optional(&state.pool)
    .await?;

    if owned.is_none() {
        return Err(ApiError::NotFound);
    }

    let result = state.license.verify(&license_code).await.map_err(|e| {
        tracing::error!(user_id = %user.id, error = %e, "License verification failed");
        ApiError::ServiceUnavailable
    })?;

    Ok(Json(VerifyLicenseResponse {
        license_code,
        result,
    }))
}
