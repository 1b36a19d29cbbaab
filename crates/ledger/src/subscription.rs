//! Subscription history
//!
//! Subscriptions are append-only: a row is written when the provider
//! reports an activation and never mutated afterward. The "current"
//! subscription is the most recently created active, unexpired row.
//! License codes are unique system-wide so a license cannot be replayed
//! onto a second account.

use scripta_shared::Subscription;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};

#[derive(Clone)]
pub struct SubscriptionStore {
    pool: PgPool,
}

impl SubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an activation. A license code that is already registered
    /// (to any account) fails with `LicenseExists`; nothing is
    /// overwritten.
    pub async fn activate(
        &self,
        user_id: Uuid,
        license_code: &str,
        expires_at: OffsetDateTime,
    ) -> LedgerResult<Subscription> {
        let result = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (user_id, license_code, expires_at, is_active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING id, user_id, license_code, expires_at, is_active, created_at
            "#,
        )
        .bind(user_id)
        .bind(license_code)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(subscription) => {
                tracing::info!(
                    user_id = %user_id,
                    subscription_id = %subscription.id,
                    expires_at = %expires_at,
                    "Subscription activated"
                );
                Ok(subscription)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                Err(LedgerError::LicenseExists)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The current subscription, if any: newest active, unexpired row.
    pub async fn current(&self, user_id: Uuid) -> LedgerResult<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, user_id, license_code, expires_at, is_active, created_at
            FROM subscriptions
            WHERE user_id = $1 AND is_active AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Full history, newest first.
    pub async fn history(&self, user_id: Uuid) -> LedgerResult<Vec<Subscription>> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, user_id, license_code, expires_at, is_active, created_at
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscriptions)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use scripta_shared::db::create_pool;

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        create_pool(&url, 5).await.expect("Failed to create pool")
    }

    async fn create_test_user(pool: &PgPool) -> Uuid {
        let email = format!("subs-{}@test.local", Uuid::new_v4());
        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO users (email, password_hash) VALUES ($1, 'x') RETURNING id",
        )
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("Failed to create user");
        id
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_license_is_unique_across_accounts() {
        let pool = test_pool().await;
        let store = SubscriptionStore::new(pool.clone());
        let first_user = create_test_user(&pool).await;
        let second_user = create_test_user(&pool).await;
        let license = format!("LIC-{}", Uuid::new_v4());
        let expires = OffsetDateTime::now_utc() + time::Duration::days(30);

        store
            .activate(first_user, &license, expires)
            .await
            .expect("First activation should succeed");

        let replay = store.activate(second_user, &license, expires).await;
        assert!(matches!(replay, Err(LedgerError::LicenseExists)));

        // The original row is untouched
        let current = store.current(first_user).await.unwrap();
        assert_eq!(current.unwrap().license_code, license);
        assert!(store.current(second_user).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_current_skips_expired_rows() {
        let pool = test_pool().await;
        let store = SubscriptionStore::new(pool.clone());
        let user_id = create_test_user(&pool).await;

        let expired = OffsetDateTime::now_utc() - time::Duration::days(1);
        store
            .activate(user_id, &format!("LIC-{}", Uuid::new_v4()), expired)
            .await
            .unwrap();

        assert!(store.current(user_id).await.unwrap().is_none());
        assert_eq!(store.history(user_id).await.unwrap().len(), 1);
    }
}
