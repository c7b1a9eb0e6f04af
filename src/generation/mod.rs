pub mod artifacts;
pub mod prompt;
pub mod resolver;
pub mod runtime;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CONFIG;
use crate::llm::gemini::{self, GeminiEndpoint};
use artifacts::ArtifactStore;
use prompt::{build_critique_prompt, build_prompt_pair};
use runtime::{DiffusionRuntime, PipelineSettings, SamplerSettings};

/// Accepted generation request; immutable once constructed.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub room_type: String,
    pub style: String,
    pub image_path: String,
}

/// A persisted redesign image addressed by a stable relative reference.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    pub storage_path: PathBuf,
    pub public_reference: String,
}

/// Critique text produced by the remote fallback tier.
#[derive(Debug, Clone)]
pub struct TextArtifact {
    pub advice: String,
    pub source_image: String,
}

/// Terminal result of a generation request. All failure paths are data;
/// nothing escapes the orchestrator as an error.
#[derive(Debug)]
pub enum GenerationOutcome {
    Image(ImageArtifact),
    Advice(TextArtifact),
    Failed(GenerationError),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Image file not found: {0}")]
    ImageNotFound(String),
    #[error("Local model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Local inference failed: {0}")]
    Inference(String),
    #[error("Failed to save generated image: {0}")]
    Persistence(String),
    #[error("Local generation failed ({local}); fallback failed: {fallback}")]
    Exhausted { local: String, fallback: String },
}

/// Everything the orchestrator needs, captured up front so the pipeline is
/// testable without ambient environment state.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub search_roots: Vec<PathBuf>,
    pub artifacts_dir: PathBuf,
    pub artifacts_public_prefix: String,
    pub pipeline: PipelineSettings,
    pub sampler: SamplerSettings,
    pub gemini: GeminiEndpoint,
}

impl GeneratorSettings {
    pub fn from_config() -> Self {
        GeneratorSettings {
            search_roots: vec![
                CONFIG.project_root.clone(),
                CONFIG.project_root.join("server"),
            ],
            artifacts_dir: CONFIG.artifacts_dir.clone(),
            artifacts_public_prefix: CONFIG.artifacts_public_prefix.clone(),
            pipeline: PipelineSettings::from_config(),
            sampler: SamplerSettings::from_config(),
            gemini: GeminiEndpoint::from_config(),
        }
    }
}

/// Two-tier generation orchestrator: local diffusion first, remote critique
/// second, typed failure last.
pub struct DesignGenerator {
    settings: GeneratorSettings,
    runtime: DiffusionRuntime,
    store: ArtifactStore,
}

impl DesignGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        let store = ArtifactStore::new(
            settings.artifacts_dir.clone(),
            settings.artifacts_public_prefix.clone(),
        );
        DesignGenerator {
            settings,
            runtime: DiffusionRuntime::new(),
            store,
        }
    }

    pub fn from_config() -> Self {
        Self::new(GeneratorSettings::from_config())
    }

    /// The whole call blocks for as long as inference takes; request-level
    /// timeouts belong to the caller.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        let Some(resolved) =
            resolver::resolve_image(&request.image_path, &self.settings.search_roots)
        else {
            return GenerationOutcome::Failed(GenerationError::ImageNotFound(
                request.image_path.clone(),
            ));
        };

        info!(
            room_type = %request.room_type,
            style = %request.style,
            image = %resolved.display(),
            "Generation request accepted"
        );

        match self.try_local(request, &resolved).await {
            Ok(artifact) => GenerationOutcome::Image(artifact),
            // A partial write is terminal; returning advice on top of a
            // half-persisted image would hide the broken artifact.
            Err(err @ GenerationError::Persistence(_)) => GenerationOutcome::Failed(err),
            Err(local_err) => self.try_fallback(request, &resolved, local_err).await,
        }
    }

    async fn try_local(
        &self,
        request: &GenerationRequest,
        resolved: &Path,
    ) -> Result<ImageArtifact, GenerationError> {
        let pipeline = self
            .runtime
            .acquire(&self.settings.pipeline)
            .await
            .map_err(|err| {
                warn!("Diffusion pipeline unavailable: {err}");
                GenerationError::ModelUnavailable(err.to_string())
            })?;
        debug!(
            model = pipeline.model_id(),
            device = pipeline.device().label(),
            "Diffusion pipeline acquired"
        );

        let source = image::open(resolved)
            .map_err(|err| {
                GenerationError::Inference(format!("could not decode input image: {err}"))
            })?
            .to_rgb8();

        let prompts = build_prompt_pair(&request.room_type, &request.style);
        let sampler = self.settings.sampler.clone();
        let rendered = tokio::task::spawn_blocking(move || {
            pipeline.generate(&prompts, &source, &sampler)
        })
        .await
        .map_err(|err| GenerationError::Inference(err.to_string()))?
        .map_err(|err| GenerationError::Inference(err.to_string()))?;

        self.store
            .save_png(&rendered)
            .map_err(|err| GenerationError::Persistence(err.to_string()))
    }

    async fn try_fallback(
        &self,
        request: &GenerationRequest,
        resolved: &Path,
        local_err: GenerationError,
    ) -> GenerationOutcome {
        if self.settings.gemini.api_key.trim().is_empty() {
            return GenerationOutcome::Failed(GenerationError::Exhausted {
                local: local_err.to_string(),
                fallback: "GEMINI_API_KEY is not configured".to_string(),
            });
        }

        info!("Falling back to remote critique for {}", resolved.display());
        let prompt = build_critique_prompt(&request.room_type, &request.style);
        match gemini::critique_room(resolved, &prompt, &self.settings.gemini).await {
            Ok(critique) => GenerationOutcome::Advice(TextArtifact {
                advice: format!(
                    "Image generation failed ({local_err}), but here is Gemini's Expert Advice:\n\n{critique}"
                ),
                source_image: resolved.display().to_string(),
            }),
            Err(fallback_err) => {
                warn!("Remote critique failed: {fallback_err}");
                GenerationOutcome::Failed(GenerationError::Exhausted {
                    local: local_err.to_string(),
                    fallback: fallback_err.to_string(),
                })
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn model_is_loaded(&self) -> bool {
        self.runtime.is_loaded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::fs;
    use std::path::Path;

    fn settings_in(root: &Path) -> GeneratorSettings {
        GeneratorSettings {
            search_roots: vec![root.to_path_buf()],
            artifacts_dir: root.join("server").join("uploads"),
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
            gemini: GeminiEndpoint {
                base_url: String::new(),
                api_key: String::new(),
            },
        }
    }

    /// One-route stand-in for the remote critique endpoint.
    async fn spawn_critique_stub(critique: &'static str) -> String {
        let app = axum::Router::new().fallback(move || async move {
            axum::Json(serde_json::json!({
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

    fn write_weights(settings: &GeneratorSettings) {
        fs::create_dir_all(&settings.pipeline.models_dir).unwrap();
        fs::write(settings.pipeline.weights_path(), b"stub weights").unwrap();
    }

    fn write_room_photo(root: &Path, name: &str) {
        let photo = RgbImage::from_fn(48, 32, |x, _| image::Rgb([x as u8, 90, 120]));
        photo.save(root.join(name)).unwrap();
    }

    fn request(image_path: &str) -> GenerationRequest {
        GenerationRequest {
            room_type: "living room".to_string(),
            style: "modern".to_string(),
            image_path: image_path.to_string(),
        }
    }

    #[tokio::test]
    async fn missing_image_fails_without_touching_the_model() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        write_weights(&settings);

        let generator = DesignGenerator::new(settings);
        let outcome = generator.generate(&request("no-such-room.png")).await;

        match outcome {
            GenerationOutcome::Failed(GenerationError::ImageNotFound(path)) => {
                assert_eq!(path, "no-such-room.png");
            }
            other => panic!("expected ImageNotFound, got {other:?}"),
        }
        assert!(!generator.model_is_loaded());
    }

    #[tokio::test]
    async fn successful_generation_persists_a_named_artifact() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        write_weights(&settings);
        write_room_photo(root.path(), "room.png");

        let generator = DesignGenerator::new(settings.clone());
        let outcome = generator.generate(&request("room.png")).await;

        let artifact = match outcome {
            GenerationOutcome::Image(artifact) => artifact,
            other => panic!("expected Image, got {other:?}"),
        };
        assert!(artifact.storage_path.is_file());
        assert!(artifact.public_reference.starts_with("uploads/generated_"));
        assert!(artifact.public_reference.ends_with(".png"));

        let filename = artifact.public_reference.rsplit('/').next().unwrap();
        assert_eq!(
            settings.artifacts_dir.join(filename),
            artifact.storage_path
        );
    }

    #[tokio::test]
    async fn back_to_back_requests_yield_distinct_references() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        write_weights(&settings);
        write_room_photo(root.path(), "room.png");

        let generator = DesignGenerator::new(settings);
        let first = generator.generate(&request("room.png")).await;
        let second = generator.generate(&request("room.png")).await;

        match (first, second) {
            (GenerationOutcome::Image(a), GenerationOutcome::Image(b)) => {
                assert_ne!(a.public_reference, b.public_reference);
            }
            other => panic!("expected two images, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn local_failure_with_credential_degrades_to_advice() {
        let root = tempfile::tempdir().unwrap();
        let mut settings = settings_in(root.path());
        // no weights on purpose; the remote tier is configured
        settings.gemini = GeminiEndpoint {
            base_url: spawn_critique_stub("Paint the walls sage green.").await,
            api_key: "test-key".to_string(),
        };
        write_room_photo(root.path(), "room.png");

        let generator = DesignGenerator::new(settings);
        let outcome = generator.generate(&request("room.png")).await;

        let artifact = match outcome {
            GenerationOutcome::Advice(artifact) => artifact,
            other => panic!("expected Advice, got {other:?}"),
        };
        assert!(artifact.advice.starts_with("Image generation failed ("));
        assert!(artifact.advice.contains("Gemini's Expert Advice"));
        assert!(artifact.advice.contains("Paint the walls sage green."));
        assert!(artifact.source_image.ends_with("room.png"));
    }

    #[tokio::test]
    async fn unavailable_model_without_credential_is_terminal() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        // no weights on purpose; no api key either
        write_room_photo(root.path(), "room.png");

        let generator = DesignGenerator::new(settings);
        let outcome = generator.generate(&request("room.png")).await;

        match outcome {
            GenerationOutcome::Failed(GenerationError::Exhausted { local, fallback }) => {
                assert!(local.contains("not found"));
                assert!(fallback.contains("GEMINI_API_KEY"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_input_without_credential_is_terminal() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        write_weights(&settings);
        fs::write(root.path().join("room.png"), b"not an image").unwrap();

        let generator = DesignGenerator::new(settings);
        let outcome = generator.generate(&request("room.png")).await;

        match outcome {
            GenerationOutcome::Failed(GenerationError::Exhausted { local, .. }) => {
                assert!(local.contains("could not decode"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }
}
