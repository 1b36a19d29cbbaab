//! Health and probe endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

/// One probe for both /health and /health/ready
async fn database_reachable(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Full health report: overall status plus the database check
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_ok = database_reachable(&state.pool).await;

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if db_ok { "healthy" } else { "unhealthy" },
            version: env!("CARGO_PKG_VERSION"),
            database: if db_ok { "reachable" } else { "unreachable" },
        }),
    )
}

/// Liveness probe: the process is up
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: the service can reach its database
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if database_reachable(&state.pool).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
