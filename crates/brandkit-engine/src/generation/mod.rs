//! Image generation fallback chain.
//!
//! Backends are tried strictly in registration order. Each gets up to
//! `max_retries` attempts; a backend that keeps failing hands over to the
//! next one, and when the list is exhausted the chain returns a placeholder
//! instead of an error.

pub mod huggingface;
pub mod placeholder;
pub mod pollinations;

use std::thread;
use std::time::Duration;

use anyhow::Result;
use brandkit_contracts::creative::AspectRatio;
use image::DynamicImage;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::{Pacing, StudioConfig};
use crate::util::error_chain_text;

pub use huggingface::HuggingFaceBackend;
pub use placeholder::placeholder_image;
pub use pollinations::PollinationsBackend;

pub const PLACEHOLDER_BACKEND: &str = "placeholder";
pub const PRIMARY_SLOT: &str = "primary";
pub const FALLBACK_SLOT: &str = "fallback";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Native SDXL sizes.
    Primary,
    /// Sizes for lower-capacity models.
    Reduced,
}

impl ResolutionPolicy {
    pub fn dimensions(self, aspect_ratio: AspectRatio) -> (u32, u32) {
        match (self, aspect_ratio) {
            (ResolutionPolicy::Primary, AspectRatio::Square) => (1024, 1024),
            (ResolutionPolicy::Primary, AspectRatio::Portrait) => (768, 1344),
            (ResolutionPolicy::Primary, AspectRatio::Landscape) => (1344, 768),
            (ResolutionPolicy::Reduced, AspectRatio::Square) => (512, 512),
            (ResolutionPolicy::Reduced, AspectRatio::Portrait) => (512, 910),
            (ResolutionPolicy::Reduced, AspectRatio::Landscape) => (910, 512),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub width: u32,
    pub height: u32,
}

pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &BackendRequest) -> Result<DynamicImage>;

    /// Whether a failure means the model is still warming up, which earns a
    /// longer wait before the next attempt.
    fn is_loading(&self, _err: &anyhow::Error) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub name: String,
    pub max_retries: u32,
    pub resolution: ResolutionPolicy,
}

struct BackendSlot {
    descriptor: BackendDescriptor,
    backend: Box<dyn ImageBackend>,
}

/// Ordered backend list keyed by slot. Registering an existing key replaces
/// that backend in place, keeping its position.
#[derive(Default)]
pub struct ImageBackendRegistry {
    backends: IndexMap<String, BackendSlot>,
}

impl ImageBackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slots the backend under its own name.
    pub fn register<B: ImageBackend + 'static>(
        &mut self,
        backend: B,
        max_retries: u32,
        resolution: ResolutionPolicy,
    ) {
        let key = backend.name().to_string();
        self.register_as(&key, backend, max_retries, resolution);
    }

    /// Two slots may run the same model, e.g. once per resolution tier.
    pub fn register_as<B: ImageBackend + 'static>(
        &mut self,
        key: &str,
        backend: B,
        max_retries: u32,
        resolution: ResolutionPolicy,
    ) {
        let descriptor = BackendDescriptor {
            name: backend.name().to_string(),
            max_retries: max_retries.max(1),
            resolution,
        };
        self.backends.insert(
            key.to_string(),
            BackendSlot {
                descriptor,
                backend: Box::new(backend),
            },
        );
    }

    pub fn descriptors(&self) -> Vec<&BackendDescriptor> {
        self.backends.values().map(|slot| &slot.descriptor).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub backend: String,
    pub attempt: u32,
    pub loading: bool,
    pub error: String,
    /// Pause taken before the next attempt.
    pub wait: Duration,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub image: DynamicImage,
    pub backend: String,
    pub placeholder: bool,
    pub failures: Vec<AttemptFailure>,
}

pub struct ImageChain {
    registry: ImageBackendRegistry,
    pacing: Pacing,
}

impl ImageChain {
    pub fn new(registry: ImageBackendRegistry, pacing: Pacing) -> Self {
        Self { registry, pacing }
    }

    /// Hosted models need the image credential and are left out without it;
    /// the keyless endpoint is always last.
    pub fn from_config(config: &StudioConfig) -> Self {
        let mut registry = ImageBackendRegistry::new();
        if let Some(api_key) = config.image_api_key.as_deref() {
            registry.register_as(
                PRIMARY_SLOT,
                HuggingFaceBackend::new(
                    &config.huggingface_api_base,
                    &config.primary_model,
                    api_key,
                ),
                config.retries,
                ResolutionPolicy::Primary,
            );
            registry.register_as(
                FALLBACK_SLOT,
                HuggingFaceBackend::new(
                    &config.huggingface_api_base,
                    &config.fallback_model,
                    api_key,
                ),
                config.retries,
                ResolutionPolicy::Reduced,
            );
        } else {
            warn!("image API key not set; skipping hosted models");
        }
        registry.register(
            PollinationsBackend::new(&config.pollinations_api_base),
            config.retries,
            ResolutionPolicy::Reduced,
        );
        Self::new(registry, config.pacing)
    }

    pub fn registry(&self) -> &ImageBackendRegistry {
        &self.registry
    }

    /// Never fails; the worst case is the placeholder image.
    pub fn generate(&self, prompt: &str, aspect_ratio: AspectRatio) -> GenerationOutcome {
        let mut failures = Vec::new();
        for slot in self.registry.backends.values() {
            let descriptor = &slot.descriptor;
            let (width, height) = descriptor.resolution.dimensions(aspect_ratio);
            let request = BackendRequest {
                prompt: prompt.to_string(),
                aspect_ratio,
                width,
                height,
            };
            info!(backend = %descriptor.name, width, height, "trying backend");

            for attempt in 1..=descriptor.max_retries {
                debug!(
                    backend = %descriptor.name,
                    attempt,
                    max = descriptor.max_retries,
                    "generation attempt"
                );
                match slot.backend.generate(&request) {
                    Ok(image) => {
                        info!(
                            backend = %descriptor.name,
                            %aspect_ratio,
                            "generated creative"
                        );
                        return GenerationOutcome {
                            image,
                            backend: descriptor.name.clone(),
                            placeholder: false,
                            failures,
                        };
                    }
                    Err(err) => {
                        let loading = slot.backend.is_loading(&err);
                        let wait = if loading {
                            self.pacing.loading_wait
                        } else {
                            self.pacing.failure_wait
                        };
                        let error = error_chain_text(&err, 1024);
                        warn!(
                            backend = %descriptor.name,
                            attempt,
                            loading,
                            wait_ms = wait.as_millis() as u64,
                            error = %error,
                            "generation attempt failed"
                        );
                        failures.push(AttemptFailure {
                            backend: descriptor.name.clone(),
                            attempt,
                            loading,
                            error,
                            wait,
                        });
                        pause(wait);
                    }
                }
            }
            warn!(backend = %descriptor.name, "backend exhausted, switching to next");
        }

        warn!("all backends failed; returning placeholder");
        GenerationOutcome {
            image: placeholder_image(),
            backend: PLACEHOLDER_BACKEND.to_string(),
            placeholder: true,
            failures,
        }
    }
}

pub(crate) fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
