use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::captions::CaptionSet;
use crate::creative::{AspectRatio, CreativeRecord};
use crate::profile::BrandProfile;

pub const MAX_VARIATIONS: u32 = 3;
pub const DEFAULT_AUDIENCE: &str = "general consumers";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("a brand logo is required ({0})")]
    MissingLogo(String),
    #[error("brand name is required")]
    MissingBrand,
    #[error("product name is required")]
    MissingProduct,
    #[error("select at least one output format")]
    NoAspectRatios,
    #[error("variations must be between 1 and {MAX_VARIATIONS} (got {0})")]
    VariationsOutOfRange(u32),
    #[error("unknown aspect ratio '{0}'")]
    UnknownAspectRatio(String),
    #[error("unknown tone '{0}' (expected luxury, playful, minimal or bold)")]
    UnknownTone(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Luxury,
    Playful,
    Minimal,
    Bold,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Luxury, Tone::Playful, Tone::Minimal, Tone::Bold];

    /// Case-insensitive lookup; `None` for tones outside the known four.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "luxury" => Some(Tone::Luxury),
            "playful" => Some(Tone::Playful),
            "minimal" => Some(Tone::Minimal),
            "bold" => Some(Tone::Bold),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Luxury => "luxury",
            Tone::Playful => "playful",
            Tone::Minimal => "minimal",
            Tone::Bold => "bold",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = InputError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Tone::parse(raw).ok_or_else(|| InputError::UnknownTone(raw.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub logo: PathBuf,
    pub brand_name: String,
    pub product_name: String,
    pub tone: Tone,
    pub target_audience: String,
    pub variations: u32,
    pub aspect_ratios: Vec<AspectRatio>,
}

impl SessionRequest {
    pub fn new(
        logo: impl Into<PathBuf>,
        brand_name: impl Into<String>,
        product_name: impl Into<String>,
        tone: Tone,
    ) -> Self {
        Self {
            logo: logo.into(),
            brand_name: brand_name.into(),
            product_name: product_name.into(),
            tone,
            target_audience: DEFAULT_AUDIENCE.to_string(),
            variations: 2,
            aspect_ratios: AspectRatio::ALL.to_vec(),
        }
    }

    pub fn with_variations(mut self, variations: u32) -> Self {
        self.variations = variations;
        self
    }

    pub fn with_aspect_ratios(mut self, aspect_ratios: Vec<AspectRatio>) -> Self {
        self.aspect_ratios = aspect_ratios;
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = audience.into();
        self
    }

    /// Checks required fields and returns a trimmed copy with duplicate
    /// aspect ratios removed (first occurrence wins).
    pub fn validated(&self) -> Result<SessionRequest, InputError> {
        if self.logo.as_os_str().is_empty() {
            return Err(InputError::MissingLogo("no path given".to_string()));
        }
        if !self.logo.is_file() {
            return Err(InputError::MissingLogo(format!(
                "file not found: {}",
                self.logo.display()
            )));
        }
        let brand_name = self.brand_name.trim();
        if brand_name.is_empty() {
            return Err(InputError::MissingBrand);
        }
        let product_name = self.product_name.trim();
        if product_name.is_empty() {
            return Err(InputError::MissingProduct);
        }
        if !(1..=MAX_VARIATIONS).contains(&self.variations) {
            return Err(InputError::VariationsOutOfRange(self.variations));
        }
        let mut aspect_ratios = Vec::new();
        for ratio in &self.aspect_ratios {
            if !aspect_ratios.contains(ratio) {
                aspect_ratios.push(*ratio);
            }
        }
        if aspect_ratios.is_empty() {
            return Err(InputError::NoAspectRatios);
        }
        let audience = self.target_audience.trim();
        Ok(SessionRequest {
            logo: self.logo.clone(),
            brand_name: brand_name.to_string(),
            product_name: product_name.to_string(),
            tone: self.tone,
            target_audience: if audience.is_empty() {
                DEFAULT_AUDIENCE.to_string()
            } else {
                audience.to_string()
            },
            variations: self.variations,
            aspect_ratios,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_dir: PathBuf,
    pub archive_path: PathBuf,
    pub brand_profile: BrandProfile,
    pub creative_count: usize,
    pub creatives: Vec<CreativeRecord>,
    pub captions: CaptionSet,
}
