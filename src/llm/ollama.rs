use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::CONFIG;
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

/// One turn of a chat exchange in Ollama's wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(message) = value.get("error").and_then(|v| v.as_str()) {
            return message.to_string();
        }
    }
    truncate_for_log(trimmed, 800)
}

/// Non-streaming `/api/chat` call against the configured local backend.
pub async fn chat(messages: &[ChatMessage]) -> Result<String> {
    let model = &CONFIG.ollama_model;
    let url = format!(
        "{}/api/chat",
        CONFIG.ollama_base_url.trim_end_matches('/')
    );
    let payload = json!({
        "model": model,
        "messages": messages,
        "stream": false,
    });
    debug!(
        target: "llm.ollama",
        model = %model,
        messages = messages.len(),
        "Dispatching chat exchange"
    );

    log_llm_timing("ollama", model, "chat", || async {
        let response = get_http_client()
            .post(&url)
            .timeout(Duration::from_secs(CONFIG.ollama_timeout_seconds))
            .json(&payload)
            .send()
            .await
            .map_err(|err| anyhow!("Ollama request failed: {err}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Ollama request failed with status {}: {}",
                status,
                summarize_error_body(&body)
            ));
        }

        let parsed = response.json::<OllamaChatResponse>().await?;
        let reply = parsed
            .message
            .map(|message| message.content)
            .unwrap_or_default();
        if reply.trim().is_empty() {
            return Err(anyhow!("Ollama returned an empty reply"));
        }
        Ok(reply)
    })
    .await
}
