use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::session::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 3] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Landscape,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
        }
    }

    /// Folder (and file suffix) used for this ratio inside a session directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            AspectRatio::Square => "1x1",
            AspectRatio::Portrait => "9x16",
            AspectRatio::Landscape => "16x9",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Square => "Instagram Post",
            AspectRatio::Portrait => "Instagram Story",
            AspectRatio::Landscape => "YouTube Thumbnail",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = InputError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1:1" | "1x1" | "square" => Ok(AspectRatio::Square),
            "9:16" | "9x16" | "portrait" | "story" => Ok(AspectRatio::Portrait),
            "16:9" | "16x9" | "landscape" | "wide" => Ok(AspectRatio::Landscape),
            _ => Err(InputError::UnknownAspectRatio(raw.trim().to_string())),
        }
    }
}

/// Persisted description of one generated creative. The pixel buffer itself
/// lives only on disk at `path` (relative to the session directory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeRecord {
    pub id: u32,
    pub variation: u32,
    pub aspect_ratio: AspectRatio,
    pub prompt: String,
    pub backend: String,
    #[serde(default)]
    pub placeholder: bool,
    pub width: u32,
    pub height: u32,
    pub path: String,
}

impl CreativeRecord {
    pub fn file_name(id: u32, aspect_ratio: AspectRatio) -> String {
        format!("creative_{id}_{}.png", aspect_ratio.dir_name())
    }
}

pub fn write_creatives(path: &Path, creatives: &[CreativeRecord]) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(creatives)?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}

pub fn read_creatives(path: &Path) -> anyhow::Result<Vec<CreativeRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid creatives {}", path.display()))
}
