//! Token usage ledger
//!
//! All balance mutation goes through this service. Debit is a single
//! row-scoped atomic statement, so two concurrent debits for the same
//! user cannot both observe `remaining == 1` and drive the balance
//! negative. Credit runs its idempotency check and the balance upsert
//! inside one transaction; a failure anywhere rolls the whole operation
//! back.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::packages::TokenPackage;

#[derive(Clone)]
pub struct TokenLedger {
    pool: PgPool,
}

impl TokenLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Consume one token. Fails with `InsufficientTokens` when the user
    /// has no balance row or the balance is already zero; no mutation
    /// happens in that case. Returns the balance after the debit.
    pub async fn debit(&self, user_id: Uuid) -> LedgerResult<i64> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE chat_tokens
            SET remaining = remaining - 1, updated_at = NOW()
            WHERE user_id = $1 AND remaining > 0
            RETURNING remaining
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((remaining,)) => {
                tracing::debug!(user_id = %user_id, remaining = remaining, "Token debited");
                Ok(i64::from(remaining))
            }
            None => Err(LedgerError::InsufficientTokens),
        }
    }

    /// Credit the grant for `package`. When `provider_event_id` is
    /// present the credit is recorded under that id and a replayed
    /// delivery becomes a no-op returning the current balance. A missing
    /// balance row is created seeded with the grant; an existing one is
    /// added to, never reset. Returns the balance after the credit.
    pub async fn credit(
        &self,
        user_id: Uuid,
        package: TokenPackage,
        provider_event_id: Option<&str>,
    ) -> LedgerResult<i64> {
        let amount = package.grant_amount();
        let mut tx = self.pool.begin().await?;

        if let Some(event_id) = provider_event_id {
            let inserted = sqlx::query(
                r#"
                INSERT INTO ledger_credits (provider_event_id, user_id, amount)
                VALUES ($1, $2, $3)
                ON CONFLICT (provider_event_id) DO NOTHING
                "#,
            )
            .bind(event_id)
            .bind(user_id)
            .bind(amount)
            .execute(&mut *tx)
            .await?;

            if inserted.rows_affected() == 0 {
                // Replayed delivery: the credit was already applied.
                let row: Option<(i32,)> =
                    sqlx::query_as("SELECT remaining FROM chat_tokens WHERE user_id = $1")
                        .bind(user_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                tx.commit().await?;

                let remaining = row.map(|(r,)| i64::from(r)).unwrap_or(0);
                tracing::info!(
                    user_id = %user_id,
                    provider_event_id = %event_id,
                    "Duplicate credit delivery ignored"
                );
                return Ok(remaining);
            }
        }

        let (remaining,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO chat_tokens (user_id, remaining)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET remaining = chat_tokens.remaining + EXCLUDED.remaining,
                updated_at = NOW()
            RETURNING remaining
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            package = %package,
            amount = amount,
            remaining = remaining,
            "Tokens credited"
        );
        Ok(i64::from(remaining))
    }

    /// Current balance; 0 when no balance row exists (not an error).
    pub async fn peek(&self, user_id: Uuid) -> LedgerResult<i64> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT remaining FROM chat_tokens WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(r,)| i64::from(r)).unwrap_or(0))
    }
}

/// Seed the balance row for a fresh account. Runs on the registration
/// transaction's connection so the account and its grant commit
/// together.
pub async fn grant_signup_tokens<'e, E>(executor: E, user_id: Uuid, amount: i32) -> LedgerResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO chat_tokens (user_id, remaining)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .execute(executor)
    .await?;

    Ok(())
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
        let email = format!("ledger-{}@test.local", Uuid::new_v4());
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
    async fn test_debit_without_balance_row_fails() {
        let pool = test_pool().await;
        let ledger = TokenLedger::new(pool.clone());
        let user_id = create_test_user(&pool).await;

        let result = ledger.debit(user_id).await;
        assert!(matches!(result, Err(LedgerError::InsufficientTokens)));
        assert_eq!(ledger.peek(user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_credit_then_debit_round_trip() {
        let pool = test_pool().await;
        let ledger = TokenLedger::new(pool.clone());
        let user_id = create_test_user(&pool).await;

        assert_eq!(
            ledger
                .credit(user_id, TokenPackage::Silver, None)
                .await
                .unwrap(),
            5
        );
        // Credits add, they never reset
        assert_eq!(
            ledger
                .credit(user_id, TokenPackage::Silver, None)
                .await
                .unwrap(),
            10
        );
        assert_eq!(ledger.debit(user_id).await.unwrap(), 9);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_credit_is_idempotent_per_event_id() {
        let pool = test_pool().await;
        let ledger = TokenLedger::new(pool.clone());
        let user_id = create_test_user(&pool).await;
        let event_id = format!("evt-{}", Uuid::new_v4());

        let first = ledger
            .credit(user_id, TokenPackage::Gold, Some(&event_id))
            .await
            .unwrap();
        let replay = ledger
            .credit(user_id, TokenPackage::Gold, Some(&event_id))
            .await
            .unwrap();

        assert_eq!(first, 100);
        assert_eq!(replay, 100);
        assert_eq!(ledger.peek(user_id).await.unwrap(), 100);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_concurrent_debits_never_go_negative() {
        let pool = test_pool().await;
        let ledger = TokenLedger::new(pool.clone());
        let user_id = create_test_user(&pool).await;

        ledger
            .credit(user_id, TokenPackage::Silver, None)
            .await
            .unwrap();

        // 20 concurrent debits against a balance of 5: exactly 5 succeed.
        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move { ledger.debit(user_id).await }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 5);
        assert_eq!(ledger.peek(user_id).await.unwrap(), 0);
    }
}
