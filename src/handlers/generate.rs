use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::generation::{GenerationError, GenerationOutcome, GenerationRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub room_type: Option<String>,
    pub style: Option<String>,
    pub image_path: Option<String>,
}

/// POST /generate: two-tier redesign. The outcome type decides the wire
/// shape; failures surface as structured errors, never panics.
pub async fn generate_design(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> (StatusCode, Json<Value>) {
    let Some(image_path) = body
        .image_path
        .filter(|path| !path.trim().is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": "Invalid inputs" })),
        );
    };

    let request = GenerationRequest {
        room_type: body.room_type.unwrap_or_else(|| "living room".to_string()),
        style: body.style.unwrap_or_else(|| "modern".to_string()),
        image_path,
    };

    match state.generator.generate(&request).await {
        GenerationOutcome::Image(artifact) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "generated_image": artifact.public_reference,
                "message": "Design generated successfully by Local Stable Diffusion.",
            })),
        ),
        GenerationOutcome::Advice(artifact) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "generated_image": artifact.source_image,
                "message": artifact.advice,
                "fallback": true,
            })),
        ),
        GenerationOutcome::Failed(err) => {
            error!("Generation failed: {err}");
            let status = match err {
                GenerationError::ImageNotFound(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(json!({ "status": "error", "message": err.to_string() })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::runtime::{PipelineSettings, SamplerSettings};
    use crate::generation::{DesignGenerator, GeneratorSettings};
    use crate::llm::gemini::GeminiEndpoint;
    use image::RgbImage;
    use std::path::Path;

    async fn spawn_critique_stub(critique: &'static str) -> String {
        let app = axum::Router::new().fallback(move || async move {
            Json(json!({
                "candidates": [{ "content": { "parts": [{ "text": critique }] } }]
            }))
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn settings_in(root: &Path, gemini: GeminiEndpoint) -> GeneratorSettings {
        GeneratorSettings {
            search_roots: vec![root.to_path_buf()],
            artifacts_dir: root.join("uploads"),
            artifacts_public_prefix: "uploads".to_string(),
            pipeline: PipelineSettings {
                model_id: "test/mini-diffusion".to_string(),
                models_dir: root.join("models"),
                device_preference: "cpu".to_string(),
            },
            sampler: SamplerSettings {
                num_inference_steps: 4,
                guidance_scale: 7.5,
            },
            gemini,
        }
    }

    #[tokio::test]
    async fn fallback_success_carries_the_fallback_flag() {
        let root = tempfile::tempdir().unwrap();
        // no weights on purpose; local synthesis fails, the critique tier answers
        let gemini = GeminiEndpoint {
            base_url: spawn_critique_stub("Add warm brass lighting.").await,
            api_key: "test-key".to_string(),
        };
        let photo = RgbImage::from_fn(32, 24, |x, _| image::Rgb([x as u8, 90, 120]));
        photo.save(root.path().join("room.png")).unwrap();

        let state = AppState::new(DesignGenerator::new(settings_in(root.path(), gemini)));
        let body = GenerateBody {
            room_type: Some("living room".to_string()),
            style: Some("modern".to_string()),
            image_path: Some("room.png".to_string()),
        };
        let (status, Json(value)) = generate_design(State(state), Json(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["status"], "success");
        assert_eq!(value["fallback"], true);
        let message = value["message"].as_str().unwrap();
        assert!(message.starts_with("Image generation failed ("));
        assert!(message.contains("Add warm brass lighting."));
        assert!(value["generated_image"].as_str().unwrap().ends_with("room.png"));
    }

    #[tokio::test]
    async fn missing_image_path_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let gemini = GeminiEndpoint {
            base_url: String::new(),
            api_key: String::new(),
        };
        let state = AppState::new(DesignGenerator::new(settings_in(root.path(), gemini)));
        let body = GenerateBody {
            room_type: None,
            style: None,
            image_path: Some("   ".to_string()),
        };
        let (status, Json(value)) = generate_design(State(state), Json(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "Invalid inputs");
    }
}
