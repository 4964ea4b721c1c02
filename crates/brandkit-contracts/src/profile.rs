use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub type Rgb = (u8, u8, u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Luxury,
    Playful,
    Minimal,
    Bold,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Luxury => "luxury",
            Mood::Playful => "playful",
            Mood::Minimal => "minimal",
            Mood::Bold => "bold",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Brightness {
    Dark,
    Medium,
    Light,
}

impl Brightness {
    pub fn as_str(self) -> &'static str {
        match self {
            Brightness::Dark => "dark",
            Brightness::Medium => "medium",
            Brightness::Light => "light",
        }
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSwatch {
    pub rgb: Rgb,
    pub hex: String,
}

impl ColorSwatch {
    pub fn new(rgb: Rgb) -> Self {
        Self {
            rgb,
            hex: rgb_hex(rgb),
        }
    }
}

/// Color identity of a brand, derived once per session from its logo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandProfile {
    pub dominant_color: ColorSwatch,
    pub palette: Vec<ColorSwatch>,
    pub mood: Mood,
    pub brightness: Brightness,
}

impl BrandProfile {
    /// First `limit` palette hex codes, in palette order.
    pub fn palette_hexes(&self, limit: usize) -> Vec<&str> {
        self.palette
            .iter()
            .take(limit)
            .map(|swatch| swatch.hex.as_str())
            .collect()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid profile {}", path.display()))
    }
}

/// Lowercase `#rrggbb`.
pub fn rgb_hex(rgb: Rgb) -> String {
    format!("#{}", hex::encode([rgb.0, rgb.1, rgb.2]))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{rgb_hex, BrandProfile, Brightness, ColorSwatch, Mood};

    fn sample_profile() -> BrandProfile {
        BrandProfile {
            dominant_color: ColorSwatch::new((64, 64, 64)),
            palette: vec![
                ColorSwatch::new((64, 64, 64)),
                ColorSwatch::new((128, 128, 128)),
                ColorSwatch::new((250, 10, 171)),
                ColorSwatch::new((0, 0, 0)),
            ],
            mood: Mood::Luxury,
            brightness: Brightness::Dark,
        }
    }

    #[test]
    fn hex_is_lowercase_and_zero_padded() {
        assert_eq!(rgb_hex((64, 64, 64)), "#404040");
        assert_eq!(rgb_hex((250, 10, 171)), "#fa0aab");
        assert_eq!(rgb_hex((0, 0, 0)), "#000000");
    }

    #[test]
    fn profile_serializes_with_lowercase_enums_and_rgb_arrays() -> anyhow::Result<()> {
        let value = serde_json::to_value(sample_profile())?;
        assert_eq!(value["mood"], json!("luxury"));
        assert_eq!(value["brightness"], json!("dark"));
        assert_eq!(value["dominant_color"]["rgb"], json!([64, 64, 64]));
        assert_eq!(value["dominant_color"]["hex"], json!("#404040"));
        assert_eq!(
            value["palette"].as_array().map(Vec::len).unwrap_or_default(),
            4
        );
        assert!(value.get("palette").and_then(Value::as_array).is_some());
        Ok(())
    }

    #[test]
    fn palette_hexes_respects_limit() {
        let profile = sample_profile();
        assert_eq!(
            profile.palette_hexes(3),
            vec!["#404040", "#808080", "#fa0aab"]
        );
        assert_eq!(profile.palette_hexes(10).len(), 4);
    }

    #[test]
    fn save_then_load_preserves_profile() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("brand_profile.json");
        let profile = sample_profile();
        profile.save(&path)?;
        assert_eq!(BrandProfile::load(&path)?, profile);
        Ok(())
    }
}
