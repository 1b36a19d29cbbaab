//! Authentication routes

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{hash_password, validate_password, verify_password, AuthUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn token_pair(state: &AppState, user_id: Uuid, email: &str) -> ApiResult<(String, String)> {
    let access = state
        .jwt
        .generate_access_token(user_id, email)
        .map_err(|_| ApiError::Internal)?;
    let refresh = state
        .jwt
        .generate_refresh_token(user_id, email)
        .map_err(|_| ApiError::Internal)?;
    Ok((access, refresh))
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    if !state.config.enable_signup {
        return Err(ApiError::BadRequest(
            "Registration is currently disabled".to_string(),
        ));
    }

    if !is_valid_email(&req.email) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }
    validate_password(&req.password).map_err(|e| ApiError::Validation(e.to_string()))?;

    let email = req.email.to_lowercase();
    let password_hash = hash_password(&req.password).map_err(|_| ApiError::Internal)?;

    // Create user and seed the starter balance in one transaction
    let mut tx = state.pool.begin().await?;

    let inserted: Option<(Uuid, OffsetDateTime)> = sqlx::query_as(
        r#"
        INSERT INTO users (email, password_hash)
        VALUES ($1, $2)
        ON CONFLICT (email) DO NOTHING
        RETURNING id, created_at
        "#,
    )
    .bind(&email)
    .bind(&password_hash)
    .fetch_optional(&mut *tx)
    .await?;

    let (user_id, created_at) = inserted.ok_or(ApiError::EmailAlreadyExists)?;

    scripta_ledger::grant_signup_tokens(&mut *tx, user_id, state.config.signup_token_grant)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user_id, "User registered");

    let (access_token, refresh_token) = token_pair(&state, user_id, &email)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: state.jwt.access_token_expiry_seconds(),
            user: UserResponse {
                id: user_id,
                email,
                created_at,
            },
        }),
    ))
}

/// Log in with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = req.email.to_lowercase();

    let user: Option<(Uuid, String, OffsetDateTime)> = sqlx::query_as(
        "SELECT id, password_hash, created_at FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?;

    // Same error for unknown email and wrong password
    let (user_id, password_hash, created_at) = user.ok_or(ApiError::InvalidCredentials)?;

    let valid =
        verify_password(&req.password, &password_hash).map_err(|_| ApiError::Internal)?;
    if !valid {
        tracing::warn!(user_id = %user_id, "Login failed: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let (access_token, refresh_token) = token_pair(&state, user_id, &email)?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_token_expiry_seconds(),
        user: UserResponse {
            id: user_id,
            email,
            created_at,
        },
    }))
}

/// Exchange a refresh token for a new token pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let claims = state
        .jwt
        .validate_refresh_token(&req.refresh_token)
        .map_err(|_| ApiError::InvalidToken)?;

    // The account may have been deleted since the token was issued
    let user: Option<(String, OffsetDateTime)> =
        sqlx::query_as("SELECT email, created_at FROM users WHERE id = $1")
            .bind(claims.sub)
            .fetch_optional(&state.pool)
            .await?;
    let (email, created_at) = user.ok_or(ApiError::InvalidToken)?;

    let (access_token, refresh_token) = token_pair(&state, claims.sub, &email)?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_token_expiry_seconds(),
        user: UserResponse {
            id: claims.sub,
            email,
            created_at,
        },
    }))
}

/// Request a password reset token
///
/// Always answers 200 with the same message so the endpoint cannot be
/// used to probe which emails have accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = req.email.to_lowercase();

    let user: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;

    if let Some((user_id,)) = user {
        let token = state
            .reset_tokens
            .issue(user_id)
            .await
            .map_err(|_| ApiError::Internal)?;
        // No mail transport wired up yet; operators pull the link from logs
        tracing::info!(
            user_id = %user_id,
            reset_url = %format!("{}/reset-password?token={}", state.config.public_url, token),
            "Password reset token issued"
        );
    }

    Ok(Json(MessageResponse {
        message: "If that email is registered, a reset link has been sent".to_string(),
    }))
}

/// Complete a password reset with a token from forgot-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    validate_password(&req.password).map_err(|e| ApiError::Validation(e.to_string()))?;

    let user_id = state
        .reset_tokens
        .consume(&req.token)
        .await
        .map_err(|_| ApiError::InvalidToken)?;

    let password_hash = hash_password(&req.password).map_err(|_| ApiError::Internal)?;

    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&password_hash)
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    tracing::info!(user_id = %user_id, "Password reset completed");

    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}

/// Current authenticated user
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<UserResponse>> {
    let (created_at,): (OffsetDateTime,) =
        sqlx::query_as("SELECT created_at FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&state.pool)
            .await?;

    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
        created_at,
    }))
}
