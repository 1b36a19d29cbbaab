//! JWT token generation and validation

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// JWT claims structure for Scripta-issued tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Email
    pub email: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT manager for token operations
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_hours: i64,
    refresh_token_expiry_days: i64,
}

impl JwtManager {
    /// Create a new JWT manager
    pub fn new(secret: &str, access_token_expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expiry_hours,
            refresh_token_expiry_days: 30, // Refresh tokens last 30 days
        }
    }

    fn generate(
        &self,
        user_id: Uuid,
        email: &str,
        token_type: TokenType,
        lifetime: Duration,
    ) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + lifetime).unix_timestamp(),
            token_type,
        };

        // Explicit algorithm prevents algorithm confusion attacks
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Generate an access token
    pub fn generate_access_token(&self, user_id: Uuid, email: &str) -> Result<String, JwtError> {
        self.generate(
            user_id,
            email,
            TokenType::Access,
            Duration::hours(self.access_token_expiry_hours),
        )
    }

    /// Generate a refresh token
    pub fn generate_refresh_token(&self, user_id: Uuid, email: &str) -> Result<String, JwtError> {
        self.generate(
            user_id,
            email,
            TokenType::Refresh,
            Duration::days(self.refresh_token_expiry_days),
        )
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60; // 60 second clock skew tolerance

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::Invalid,
                _ => JwtError::Validation(e.to_string()),
            })
    }

    /// Validate an access token specifically
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Validate a refresh token specifically
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Get access token expiry in seconds
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_hours * 3600
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Wrong token type")]
    WrongTokenType,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
    #[error("Token validation failed: {0}")]
    Validation(String),
}
