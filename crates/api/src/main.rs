//! Scripta API server entry point

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scripta_api::{routes::create_router, AppState, Config};
use scripta_shared::db::{create_pool, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present; real deployments set the environment directly
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,scripta_api=debug,scripta_ledger=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    if config.payment_webhook_secret.is_none() {
        tracing::warn!("PAYMENT_WEBHOOK_SECRET not set; payment webhook will reject all deliveries");
    }

    let bind_address = config.bind_address.clone();
    let state = AppState::new(pool, config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!(address = %bind_address, "Scripta API listening");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
