//! Password reset tokens
//!
//! One live token per user: issuing a new token replaces any previous
//! one. Tokens are single-use and expire after 24 hours.

use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

// URL-safe characters: A-Z, a-z, 0-9, _ (underscore), - (hyphen)
const TOKEN_ALPHABET: &[u8] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";
const TOKEN_LENGTH: usize = 32;
const EXPIRY_HOURS: i32 = 24;

/// Generate a random URL-safe reset token
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..TOKEN_ALPHABET.len());
            TOKEN_ALPHABET[idx] as char
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ResetTokenError {
    #[error("Invalid or expired token")]
    Invalid,
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for ResetTokenError {
    fn from(err: sqlx::Error) -> Self {
        ResetTokenError::Database(err.to_string())
    }
}

#[derive(Clone)]
pub struct ResetTokenManager {
    pool: PgPool,
}

impl ResetTokenManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Issue a reset token for a user, replacing any previous one.
    pub async fn issue(&self, user_id: Uuid) -> Result<String, ResetTokenError> {
        let token = generate_token();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, token, expires_at)
            VALUES ($1, $2, NOW() + make_interval(hours => $3))
            "#,
        )
        .bind(user_id)
        .bind(&token)
        .bind(EXPIRY_HOURS)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(token)
    }

    /// Consume a token: marks it used and returns the owning user.
    /// Fails for unknown, expired, or already-consumed tokens.
    pub async fn consume(&self, token: &str) -> Result<Uuid, ResetTokenError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE user_tokens
            SET consumed_at = NOW()
            WHERE token = $1 AND expires_at > NOW() AND consumed_at IS NULL
            RETURNING user_id
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(user_id,)| user_id)
            .ok_or(ResetTokenError::Invalid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_url_safe() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token
            .bytes()
            .all(|b| TOKEN_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_generated_tokens_differ() {
        assert_ne!(generate_token(), generate_token());
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_tokens_are_single_use() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = scripta_shared::db::create_pool(&url, 5)
            .await
            .expect("Failed to create pool");

        let email = format!("reset-{}@test.local", Uuid::new_v4());
        let (user_id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO users (email, password_hash) VALUES ($1, 'x') RETURNING id",
        )
        .bind(email)
        .fetch_one(&pool)
        .await
        .unwrap();

        let manager = ResetTokenManager::new(pool);
        let token = manager.issue(user_id).await.unwrap();

        assert_eq!(manager.consume(&token).await.unwrap(), user_id);
        assert!(matches!(
            manager.consume(&token).await,
            Err(ResetTokenError::Invalid)
        ));
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_new_token_replaces_previous() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = scripta_shared::db::create_pool(&url, 5)
            .await
            .expect("Failed to create pool");

        let email = format!("reset-{}@test.local", Uuid::new_v4());
        let (user_id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO users (email, password_hash) VALUES ($1, 'x') RETURNING id",
        )
        .bind(email)
        .fetch_one(&pool)
        .await
        .unwrap();

        let manager = ResetTokenManager::new(pool);
        let first = manager.issue(user_id).await.unwrap();
        let second = manager.issue(user_id).await.unwrap();

        assert!(matches!(
            manager.consume(&first).await,
            Err(ResetTokenError::Invalid)
        ));
        assert_eq!(manager.consume(&second).await.unwrap(), user_id);
    }
}
