use std::env;
use std::path::PathBuf;

use anyhow::Result;
use once_cell::sync::Lazy;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub port: u16,
    pub project_root: PathBuf,
    pub artifacts_dir: PathBuf,
    pub artifacts_public_prefix: String,
    pub models_dir: PathBuf,
    pub diffusion_model: String,
    pub diffusion_device: String,
    pub inference_steps: u32,
    pub guidance_scale: f32,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub gemini_temperature: f32,
    pub gemini_top_k: i32,
    pub gemini_top_p: f32,
    pub gemini_max_output_tokens: i32,
    pub gemini_timeout_seconds: u64,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_timeout_seconds: u64,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_i32(name: &str, default: i32) -> i32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn load() -> Result<Self> {
        let project_root = PathBuf::from(env_string("PROJECT_ROOT", "."));
        let artifacts_dir = match env::var("ARTIFACTS_DIR") {
            Ok(value) => PathBuf::from(value),
            Err(_) => project_root.join("server").join("uploads"),
        };
        let models_dir = match env::var("MODELS_DIR") {
            Ok(value) => PathBuf::from(value),
            Err(_) => project_root.join("models"),
        };

        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            port: env_u16("PORT", 5001),
            project_root,
            artifacts_dir,
            artifacts_public_prefix: env_string("ARTIFACTS_PUBLIC_PREFIX", "uploads"),
            models_dir,
            diffusion_model: env_string("DIFFUSION_MODEL", "runwayml/stable-diffusion-v1-5"),
            diffusion_device: env_string("DIFFUSION_DEVICE", "auto").to_lowercase(),
            inference_steps: env_u32("INFERENCE_STEPS", 25),
            guidance_scale: env_f32("GUIDANCE_SCALE", 7.5),
            gemini_api_key: env_string("GEMINI_API_KEY", ""),
            gemini_base_url: env_string(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            gemini_model: env_string("GEMINI_MODEL", "gemini-1.5-flash"),
            gemini_temperature: env_f32("GEMINI_TEMPERATURE", 0.7),
            gemini_top_k: env_i32("GEMINI_TOP_K", 40),
            gemini_top_p: env_f32("GEMINI_TOP_P", 0.95),
            gemini_max_output_tokens: env_i32("GEMINI_MAX_OUTPUT_TOKENS", 2048),
            gemini_timeout_seconds: env_u64("GEMINI_TIMEOUT_SECONDS", 90),
            ollama_base_url: env_string("OLLAMA_BASE_URL", "http://127.0.0.1:11434"),
            ollama_model: env_string("OLLAMA_MODEL", "llama3"),
            ollama_timeout_seconds: env_u64("OLLAMA_TIMEOUT_SECONDS", 120),
        })
    }
}

pub const CHAT_SYSTEM_PROMPT: &str = "You are GruhaBuddy, an expert AI interior design assistant. \
Your sole purpose is to assist users with interior design, home decor, room layout, and using the GruhaBuddy application. \
Do NOT answer questions unrelated to interior design, home improvement, or this specific application. \
If a user asks a question outside this scope or if you do not know the answer, strictly reply with: \
'I can only assist with interior design queries. For other issues, please contact our support team at 123456789.' \
Keep your answers helpful, professional, and focused on design.";

pub const DEGRADED_CHAT_REPLY: &str =
    "I'm having trouble connecting to my brain (Ollama). Please ensure it's running.";
