use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    #[serde(default)]
    pub variation: u32,
    pub headline: String,
    pub subheadline: String,
    pub cta: String,
    pub long_caption: String,
    pub hashtags: Vec<String>,
}

impl Caption {
    /// True when every text field is non-blank and at least one hashtag is present.
    pub fn is_complete(&self) -> bool {
        let filled = |value: &str| !value.trim().is_empty();
        filled(&self.headline)
            && filled(&self.subheadline)
            && filled(&self.cta)
            && filled(&self.long_caption)
            && self.hashtags.iter().any(|tag| filled(tag))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptionSet {
    pub captions: Vec<Caption>,
}

impl CaptionSet {
    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid captions {}", path.display()))
    }
}
