//! Request authentication middleware
//!
//! Validates the `Authorization: Bearer` header and injects an
//! [`AuthUser`] extension for downstream handlers.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::JwtManager;
use crate::error::ApiError;

/// State required by the auth middleware
#[derive(Clone)]
pub struct AuthState {
    pub jwt: JwtManager,
}

/// Authenticated user extracted from a valid access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Middleware that requires a valid Bearer access token
pub async fn require_auth(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or(ApiError::Unauthorized)?;

    let claims = state
        .jwt
        .validate_access_token(token)
        .map_err(|_| ApiError::InvalidToken)?;

    request.extensions_mut().insert(AuthUser {
        id: claims.sub,
        email: claims.email,
    });

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: &str) -> Request {
        Request::builder()
            .header(AUTHORIZATION, value)
            .body(Body::empty())
            .expect("Failed to build request")
    }

    #[test]
    fn test_bearer_token_extraction() {
        let request = request_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&request), Some("abc.def.ghi"));
    }

    #[test]
    fn test_non_bearer_scheme_rejected() {
        let request = request_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&request), None);
    }

    #[test]
    fn test_missing_header_rejected() {
        let request = Request::builder()
            .body(Body::empty())
            .expect("Failed to build request");
        assert_eq!(bearer_token(&request), None);
    }
}
