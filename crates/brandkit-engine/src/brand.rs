use std::collections::HashMap;
use std::path::Path;

use brandkit_contracts::profile::{BrandProfile, Brightness, ColorSwatch, Mood, Rgb};
use image::DynamicImage;
use tracing::{info, warn};

use crate::config::{ProfileThresholds, StudioConfig, DEFAULT_PALETTE_SIZE};

pub const DEFAULT_PALETTE: [Rgb; 5] = [
    (64, 64, 64),
    (128, 128, 128),
    (192, 192, 192),
    (255, 255, 255),
    (0, 0, 0),
];
pub const DEFAULT_DOMINANT: Rgb = (64, 64, 64);

const HISTOGRAM_SHIFT: u8 = 3;
const MIN_ALPHA: u8 = 125;
const WHITE_CUTOFF: u8 = 250;

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileAnalysis {
    pub profile: BrandProfile,
    /// Set when the logo could not be read and the default palette was used.
    pub fallback: bool,
}

#[derive(Debug, Clone)]
pub struct BrandAnalyzer {
    palette_size: usize,
    thresholds: ProfileThresholds,
}

impl Default for BrandAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE_SIZE, ProfileThresholds::default())
    }
}

impl BrandAnalyzer {
    pub fn new(palette_size: usize, thresholds: ProfileThresholds) -> Self {
        Self {
            palette_size: palette_size.max(1),
            thresholds,
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(config.palette_size, config.thresholds)
    }

    /// Never fails: unreadable or fully transparent logos get the default
    /// greyscale palette.
    pub fn analyze(&self, logo: &Path) -> ProfileAnalysis {
        info!(logo = %logo.display(), "analyzing brand style");
        let extracted = match image::open(logo) {
            Ok(decoded) => {
                let palette = extract_palette(&decoded, self.palette_size);
                if palette.is_none() {
                    warn!(logo = %logo.display(), "logo has no opaque colored pixels");
                }
                palette
            }
            Err(err) => {
                warn!(logo = %logo.display(), error = %err, "error extracting colors");
                None
            }
        };

        let (palette, fallback) = match extracted {
            Some(palette) => (palette, false),
            None => (self.default_palette(), true),
        };
        let dominant = if fallback {
            DEFAULT_DOMINANT
        } else {
            palette.first().copied().unwrap_or(DEFAULT_DOMINANT)
        };
        let profile = self.build_profile(dominant, &palette);
        info!(
            mood = %profile.mood,
            dominant = %profile.dominant_color.hex,
            brightness = %profile.brightness,
            "brand profile ready"
        );
        ProfileAnalysis { profile, fallback }
    }

    pub fn build_profile(&self, dominant: Rgb, palette: &[Rgb]) -> BrandProfile {
        let brightness = classify_brightness(dominant, &self.thresholds);
        let variance = palette_variance(palette);
        BrandProfile {
            dominant_color: ColorSwatch::new(dominant),
            palette: palette.iter().copied().map(ColorSwatch::new).collect(),
            mood: predict_mood(brightness, variance, &self.thresholds),
            brightness,
        }
    }

    fn default_palette(&self) -> Vec<Rgb> {
        DEFAULT_PALETTE
            .iter()
            .copied()
            .cycle()
            .take(self.palette_size)
            .collect()
    }
}

pub fn brightness_value(rgb: Rgb) -> f64 {
    (rgb.0 as f64 + rgb.1 as f64 + rgb.2 as f64) / 3.0
}

pub fn classify_brightness(rgb: Rgb, thresholds: &ProfileThresholds) -> Brightness {
    let value = brightness_value(rgb);
    if value < thresholds.dark_below {
        Brightness::Dark
    } else if value < thresholds.medium_below {
        Brightness::Medium
    } else {
        Brightness::Light
    }
}

/// Population standard deviation over every channel value in the palette.
pub fn palette_variance(palette: &[Rgb]) -> f64 {
    let values: Vec<f64> = palette
        .iter()
        .flat_map(|rgb| [rgb.0 as f64, rgb.1 as f64, rgb.2 as f64])
        .collect();
    if values.is_empty() {
        return 0.0;
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let squared = values
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>();
    (squared / count).sqrt()
}

/// First match wins; the order of these checks is part of the contract.
pub fn predict_mood(brightness: Brightness, variance: f64, thresholds: &ProfileThresholds) -> Mood {
    if brightness == Brightness::Dark && variance < thresholds.luxury_max_variance {
        Mood::Luxury
    } else if brightness == Brightness::Light && variance > thresholds.playful_min_variance {
        Mood::Playful
    } else if variance < thresholds.minimal_max_variance {
        Mood::Minimal
    } else {
        Mood::Bold
    }
}

#[derive(Debug, Clone, Copy)]
struct Bin {
    key: [u8; 3],
    count: u64,
    sum: [u64; 3],
}

#[derive(Debug, Clone)]
struct ColorBox {
    bins: Vec<Bin>,
    population: u64,
}

impl ColorBox {
    fn new(bins: Vec<Bin>) -> Self {
        let population = bins.iter().map(|bin| bin.count).sum();
        Self { bins, population }
    }

    fn widest_channel(&self) -> usize {
        let mut best_channel = 0;
        let mut best_range = 0u8;
        for channel in 0..3 {
            let min = self.bins.iter().map(|bin| bin.key[channel]).min().unwrap_or(0);
            let max = self.bins.iter().map(|bin| bin.key[channel]).max().unwrap_or(0);
            if max - min > best_range {
                best_range = max - min;
                best_channel = channel;
            }
        }
        best_channel
    }

    fn split(mut self) -> (ColorBox, ColorBox) {
        let channel = self.widest_channel();
        self.bins.sort_by_key(|bin| bin.key[channel]);
        let half = self.population / 2;
        let mut running = 0u64;
        let mut cut = 1;
        for (idx, bin) in self.bins.iter().enumerate() {
            running += bin.count;
            if running >= half {
                cut = idx + 1;
                break;
            }
        }
        let cut = cut.clamp(1, self.bins.len() - 1);
        let right = self.bins.split_off(cut);
        (ColorBox::new(self.bins), ColorBox::new(right))
    }

    fn average(&self) -> Rgb {
        if self.population == 0 {
            return DEFAULT_DOMINANT;
        }
        let mut sums = [0u64; 3];
        for bin in &self.bins {
            for channel in 0..3 {
                sums[channel] += bin.sum[channel];
            }
        }
        let mean = |total: u64| ((total as f64 / self.population as f64).round()).min(255.0) as u8;
        (mean(sums[0]), mean(sums[1]), mean(sums[2]))
    }
}

/// Median-cut palette ordered by population, padded to `size` by cycling.
/// `None` when no pixel survives the transparency and near-white filters.
pub fn extract_palette(image: &DynamicImage, size: usize) -> Option<Vec<Rgb>> {
    let size = size.max(1);
    let rgba = image.to_rgba8();
    let mut histogram: HashMap<[u8; 3], Bin> = HashMap::new();
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a < MIN_ALPHA {
            continue;
        }
        if r > WHITE_CUTOFF && g > WHITE_CUTOFF && b > WHITE_CUTOFF {
            continue;
        }
        let key = [r >> HISTOGRAM_SHIFT, g >> HISTOGRAM_SHIFT, b >> HISTOGRAM_SHIFT];
        let bin = histogram.entry(key).or_insert(Bin {
            key,
            count: 0,
            sum: [0; 3],
        });
        bin.count += 1;
        bin.sum[0] += r as u64;
        bin.sum[1] += g as u64;
        bin.sum[2] += b as u64;
    }
    if histogram.is_empty() {
        return None;
    }

    let mut bins: Vec<Bin> = histogram.into_values().collect();
    bins.sort_by_key(|bin| bin.key);
    let mut boxes = vec![ColorBox::new(bins)];
    while boxes.len() < size {
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, color_box)| color_box.bins.len() > 1)
            .max_by_key(|(_, color_box)| color_box.population)
            .map(|(idx, _)| idx);
        let Some(idx) = candidate else {
            break;
        };
        let (left, right) = boxes.swap_remove(idx).split();
        boxes.push(left);
        boxes.push(right);
    }

    boxes.sort_by(|left, right| right.population.cmp(&left.population));
    let found: Vec<Rgb> = boxes.iter().map(ColorBox::average).collect();
    Some(found.iter().copied().cycle().take(size).collect())
}
