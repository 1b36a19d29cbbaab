//! API routes

pub mod auth;
pub mod chat;
pub mod health;
pub mod profile;
pub mod subscription;
pub mod tokens;
pub mod webhook;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::state::AppState;

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Public API routes (no auth required) - under /api/v1
    let public_api_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        // Payment provider callback (authenticated by callback token, not JWT)
        .route("/webhook/payment", post(webhook::payment_webhook));

    // Protected API routes (auth required) - under /api/v1
    let protected_api_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/profile", get(profile::get_profile))
        .route("/profile", put(profile::update_profile))
        .route("/chat/tokens", get(tokens::get_balance))
        .route("/chat/tokens/use", post(tokens::use_token))
        .route("/chat", post(chat::complete))
        .route("/subscription", get(subscription::get_subscription))
        .route("/subscription/verify", post(subscription::verify_license))
        .layer(middleware::from_fn_with_state(auth_state, require_auth));

    let api_v1_routes = Router::new()
        .merge(public_api_routes)
        .merge(protected_api_routes);

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", api_v1_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB request body limit
        .with_state(state)
}
