//! Chat completion route
//!
//! Forwards the conversation to the completion backend. Token debiting
//! is the client's responsibility via POST /chat/tokens/use before the
//! completion request; this handler only relays.

use axum::{
    extract::{Extension, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    ai::{ChatMessage, CompletionError},
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

const MAX_MESSAGES: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
}

/// Run a chat completion for the caller
pub async fn complete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    if req.messages.is_empty() {
        return Err(ApiError::Validation("messages must not be empty".to_string()));
    }
    if req.messages.len() > MAX_MESSAGES {
        return Err(ApiError::Validation(format!(
            "messages must contain at most {} entries",
            MAX_MESSAGES
        )));
    }

    let message = state.ai.complete(&req.messages).await.map_err(|e| {
        tracing::error!(user_id = %user.id, error = %e, "Completion failed");
        match e {
            CompletionError::Status(429) => ApiError::ServiceUnavailable,
            _ => ApiError::Internal,
        }
    })?;

    Ok(Json(ChatResponse { message }))
}
