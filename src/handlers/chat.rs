use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::assistant;
use crate::config::DEGRADED_CHAT_REPLY;
use crate::llm::ollama::ChatMessage;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// POST /chat: scope-constrained assistant. Backend trouble degrades to a
/// fixed friendly reply alongside the structured error.
pub async fn chat(Json(body): Json<ChatBody>) -> (StatusCode, Json<Value>) {
    if body.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No message provided" })),
        );
    }

    match assistant::respond(&body.message, &body.history).await {
        Ok(reply) => (StatusCode::OK, Json(json!({ "reply": reply }))),
        Err(err) => {
            error!("Ollama Error: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": err.to_string(),
                    "reply": DEGRADED_CHAT_REPLY,
                })),
            )
        }
    }
}
