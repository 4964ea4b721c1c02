use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::util::{first_non_empty_env, trim_base_url};

pub const DEFAULT_HUGGINGFACE_API_BASE: &str = "https://router.huggingface.co/hf-inference/models";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_POLLINATIONS_API_BASE: &str = "https://pollinations.ai/p";
pub const DEFAULT_PRIMARY_MODEL: &str = "stabilityai/stable-diffusion-xl-base-1.0";
pub const DEFAULT_FALLBACK_MODEL: &str = "runwayml/stable-diffusion-v1-5";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_PALETTE_SIZE: usize = 5;

/// Tuned cut-offs for brightness and mood classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileThresholds {
    /// Mean channel value below which a color is dark.
    pub dark_below: f64,
    /// Mean channel value below which a non-dark color is medium.
    pub medium_below: f64,
    pub luxury_max_variance: f64,
    pub playful_min_variance: f64,
    pub minimal_max_variance: f64,
}

impl Default for ProfileThresholds {
    fn default() -> Self {
        Self {
            dark_below: 85.0,
            medium_below: 170.0,
            luxury_max_variance: 50.0,
            playful_min_variance: 80.0,
            minimal_max_variance: 40.0,
        }
    }
}

/// Every sleep the pipeline performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Wait after a hosted backend reports the model is still loading.
    pub loading_wait: Duration,
    /// Wait after any other failed attempt.
    pub failure_wait: Duration,
    /// Courtesy delay after each creative.
    pub creative_interval: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            loading_wait: Duration::ZERO,
            failure_wait: Duration::ZERO,
            creative_interval: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            loading_wait: Duration::from_secs(15),
            failure_wait: Duration::from_secs(2),
            creative_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudioConfig {
    pub image_api_key: Option<String>,
    pub text_api_key: Option<String>,
    pub huggingface_api_base: String,
    pub gemini_api_base: String,
    pub pollinations_api_base: String,
    pub primary_model: String,
    pub fallback_model: String,
    pub text_model: String,
    pub retries: u32,
    pub palette_size: usize,
    pub thresholds: ProfileThresholds,
    pub pacing: Pacing,
    pub output_dir: PathBuf,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            image_api_key: None,
            text_api_key: None,
            huggingface_api_base: DEFAULT_HUGGINGFACE_API_BASE.to_string(),
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            pollinations_api_base: DEFAULT_POLLINATIONS_API_BASE.to_string(),
            primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            retries: DEFAULT_RETRIES,
            palette_size: DEFAULT_PALETTE_SIZE,
            thresholds: ProfileThresholds::default(),
            pacing: Pacing::default(),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl StudioConfig {
    /// Reads credentials and endpoint overrides from the process environment.
    /// Missing values keep their defaults; nothing here fails.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let base = |keys: &[&str], default: String| {
            first_non_empty_env(&lookup, keys)
                .map(|value| trim_base_url(&value))
                .filter(|value| !value.is_empty())
                .unwrap_or(default)
        };
        Self {
            image_api_key: first_non_empty_env(&lookup, &["HUGGINGFACE_API_KEY", "HF_TOKEN"]),
            text_api_key: first_non_empty_env(&lookup, &["GEMINI_API_KEY", "GOOGLE_API_KEY"]),
            huggingface_api_base: base(&["HUGGINGFACE_API_BASE"], defaults.huggingface_api_base),
            gemini_api_base: base(&["GEMINI_API_BASE"], defaults.gemini_api_base),
            pollinations_api_base: base(
                &["POLLINATIONS_API_BASE"],
                defaults.pollinations_api_base,
            ),
            primary_model: first_non_empty_env(&lookup, &["BRANDKIT_PRIMARY_MODEL"])
                .unwrap_or(defaults.primary_model),
            fallback_model: first_non_empty_env(&lookup, &["BRANDKIT_FALLBACK_MODEL"])
                .unwrap_or(defaults.fallback_model),
            text_model: first_non_empty_env(&lookup, &["BRANDKIT_TEXT_MODEL"])
                .unwrap_or(defaults.text_model),
            ..defaults
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }
}
