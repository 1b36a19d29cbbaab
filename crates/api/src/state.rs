//! Shared application state

use std::sync::Arc;

use scripta_ledger::{EventReconciler, LicenseClient, SubscriptionStore, TokenLedger};
use sqlx::PgPool;

use crate::ai::{CompletionClient, CompletionConfig};
use crate::auth::{AuthState, JwtManager, ResetTokenManager};
use crate::config::Config;

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: JwtManager,
    pub reset_tokens: ResetTokenManager,
    pub ledger: TokenLedger,
    pub subscriptions: SubscriptionStore,
    pub reconciler: EventReconciler,
    pub license: LicenseClient,
    pub ai: CompletionClient,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours);
        let reset_tokens = ResetTokenManager::new(pool.clone());
        let ledger = TokenLedger::new(pool.clone());
        let subscriptions = SubscriptionStore::new(pool.clone());
        let reconciler =
            EventReconciler::new(pool.clone(), config.payment_webhook_secret.clone());
        let license = LicenseClient::with_base_url(
            config.payment_api_key.clone(),
            config.payment_product_id.clone(),
            config.payment_api_base_url.clone(),
        );
        let ai = CompletionClient::new(CompletionConfig {
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_api_base_url.clone(),
            model: config.openai_model.clone(),
        });

        Self {
            pool,
            config: Arc::new(config),
            jwt,
            reset_tokens,
            ledger,
            subscriptions,
            reconciler,
            license,
            ai,
        }
    }

    /// State subset consumed by the auth middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt: self.jwt.clone(),
        }
    }
}
