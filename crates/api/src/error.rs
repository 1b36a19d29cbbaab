//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scripta_ledger::{LedgerError, WebhookError};
use serde_json::json;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email already registered")]
    EmailAlreadyExists,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Authentication required")]
    Unauthorized,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,
    #[error("Resource already exists: {0}")]
    Conflict(String),

    // Metering
    #[error("Insufficient tokens")]
    InsufficientTokens,

    // Internal errors
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Authentication
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", self.to_string())
            }
            ApiError::EmailAlreadyExists => {
                (StatusCode::CONFLICT, "EMAIL_EXISTS", self.to_string())
            }
            ApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),

            // Validation
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            // Resources
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),

            // Metering: the one error the client UI treats specially
            // (reverting its optimistic balance decrement)
            ApiError::InsufficientTokens => {
                (StatusCode::FORBIDDEN, "INSUFFICIENT_TOKENS", self.to_string())
            }

            // Internal: never leak detail beyond a generic string
            ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database error".to_string(),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                self.to_string(),
            ),
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                self.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    // PostgreSQL unique violation
                    if code == "23505" {
                        return ApiError::Conflict("Resource already exists".to_string());
                    }
                }
                ApiError::Database(db_err.to_string())
            }
            _ => ApiError::Database(err.to_string()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientTokens => ApiError::InsufficientTokens,
            LedgerError::LicenseExists => {
                ApiError::Conflict("License code already registered".to_string())
            }
            LedgerError::Database(msg) => ApiError::Database(msg),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Unauthorized => ApiError::Unauthorized,
            WebhookError::Malformed(msg) => ApiError::BadRequest(msg),
            WebhookError::MissingEmail => {
                ApiError::BadRequest("No customer email provided".to_string())
            }
            // Non-2xx so the provider's retry policy kicks in
            WebhookError::UnknownAccount(_) => ApiError::NotFound,
            WebhookError::Ledger(inner) => inner.into(),
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_webhook_error_status_mapping() {
        assert_eq!(
            status_of(WebhookError::Unauthorized.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(WebhookError::Malformed("x".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(WebhookError::MissingEmail.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(WebhookError::UnknownAccount("a@b.c".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(WebhookError::Ledger(LedgerError::LicenseExists).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(WebhookError::Ledger(LedgerError::Database("x".to_string())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_insufficient_tokens_is_403() {
        assert_eq!(
            status_of(LedgerError::InsufficientTokens.into()),
            StatusCode::FORBIDDEN
        );
    }
}
