use brandkit_contracts::profile::BrandProfile;
use brandkit_contracts::session::Tone;

pub const GENERIC_STYLE: &str = "professional, modern";
pub const PALETTE_COLORS_IN_PROMPT: usize = 3;

/// Composition hint appended per variation, in variation order.
pub const VARIATION_MODIFIERS: [&str; 3] = [
    "centered composition",
    "lifestyle scene with product",
    "close-up product shot",
];

pub fn tone_style(tone: &str) -> &'static str {
    match Tone::parse(tone) {
        Some(Tone::Luxury) => "elegant, premium, sophisticated, minimal, high-end, 8k",
        Some(Tone::Playful) => "fun, colorful, energetic, dynamic, youthful, vibrant",
        Some(Tone::Minimal) => "clean, simple, modern, minimalist, white space, studio",
        Some(Tone::Bold) => "vibrant, eye-catching, dramatic, strong, impactful, cinematic",
        None => GENERIC_STYLE,
    }
}

pub fn build_prompt(profile: &BrandProfile, product_name: &str, tone: &str) -> String {
    let colors = profile.palette_hexes(PALETTE_COLORS_IN_PROMPT).join(", ");
    let parts = [
        format!("professional product photography of {}", product_name.trim()),
        format!("{} aesthetic", tone_style(tone)),
        format!("color scheme: {colors}"),
        "studio lighting, marketing campaign, advertisement quality".to_string(),
        "commercial photography, sharp focus, high resolution".to_string(),
        format!("{} mood, brand advertisement", profile.mood),
    ];
    normalize_whitespace(&parts.join(", "))
}

/// `None` once `index` runs past the available variation templates.
pub fn variation_prompt(base: &str, index: usize) -> Option<String> {
    VARIATION_MODIFIERS
        .get(index)
        .map(|modifier| format!("{base}, {modifier}"))
}

fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[cfg(test)]
mod tests {
    use brandkit_contracts::profile::{BrandProfile, Brightness, ColorSwatch, Mood};

    use super::{build_prompt, tone_style, variation_prompt, GENERIC_STYLE};

    fn profile() -> BrandProfile {
        BrandProfile {
            dominant_color: ColorSwatch::new((64, 64, 64)),
            palette: vec![
                ColorSwatch::new((64, 64, 64)),
                ColorSwatch::new((128, 128, 128)),
                ColorSwatch::new((192, 192, 192)),
                ColorSwatch::new((255, 255, 255)),
            ],
            mood: Mood::Luxury,
            brightness: Brightness::Dark,
        }
    }

    #[test]
    fn prompt_is_deterministic_and_single_line() {
        let first = build_prompt(&profile(), "Premium Watch", "luxury");
        let second = build_prompt(&profile(), "Premium Watch", "luxury");
        assert_eq!(first, second);
        assert!(!first.contains('\n'));
        assert!(!first.contains("  "));
    }

    #[test]
    fn prompt_carries_product_style_colors_and_mood() {
        let prompt = build_prompt(&profile(), "Premium\nWatch", "Luxury");
        assert!(prompt.starts_with("professional product photography of Premium Watch, "));
        assert!(prompt.contains("elegant, premium, sophisticated, minimal, high-end, 8k aesthetic"));
        assert!(prompt.contains("color scheme: #404040, #808080, #c0c0c0,"));
        assert!(!prompt.contains("#ffffff"));
        assert!(prompt.ends_with("luxury mood, brand advertisement"));
    }

    #[test]
    fn unknown_tone_uses_generic_style() {
        assert_eq!(tone_style("corporate"), GENERIC_STYLE);
        let prompt = build_prompt(&profile(), "Widget", "corporate");
        assert!(prompt.contains("professional, modern aesthetic"));
    }

    #[test]
    fn variation_prompt_appends_modifier_until_templates_run_out() {
        assert_eq!(
            variation_prompt("base", 1).as_deref(),
            Some("base, lifestyle scene with product")
        );
        assert_eq!(variation_prompt("base", 3), None);
    }
}
