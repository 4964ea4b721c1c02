use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Local};

use crate::captions::CaptionSet;
use crate::creative::AspectRatio;
use crate::profile::BrandProfile;

#[derive(Debug, Clone)]
pub struct SessionReport<'a> {
    pub brand_name: &'a str,
    pub product_name: &'a str,
    pub tone: &'a str,
    pub generated_at: DateTime<Local>,
    pub profile: &'a BrandProfile,
    pub creative_count: usize,
    pub aspect_ratios: &'a [AspectRatio],
    pub captions: &'a CaptionSet,
}

pub fn render_report(report: &SessionReport<'_>) -> String {
    let palette = report
        .profile
        .palette
        .iter()
        .map(|swatch| format!("- {}", swatch.hex))
        .collect::<Vec<String>>()
        .join("\n");
    let formats = report
        .aspect_ratios
        .iter()
        .map(|ratio| ratio.as_str())
        .collect::<Vec<&str>>()
        .join(", ");

    format!(
        "# Brandkit - Generation Report\n\
         \n\
         **Brand:** {brand}\n\
         **Product:** {product}\n\
         **Tone:** {tone}\n\
         **Generated:** {generated}\n\
         \n\
         ---\n\
         \n\
         ## Brand Profile\n\
         \n\
         **Dominant Color:** {dominant}\n\
         **Mood:** {mood}\n\
         **Brightness:** {brightness}\n\
         \n\
         **Color Palette:**\n\
         {palette}\n\
         \n\
         ---\n\
         \n\
         ## Generated Creatives\n\
         \n\
         Total: {count} images\n\
         Formats: {formats}\n\
         \n\
         ---\n\
         \n\
         ## Caption Variations\n\
         \n\
         {captions} caption sets generated\n\
         \n\
         Check `captions.json` for full details.\n",
        brand = report.brand_name,
        product = report.product_name,
        tone = report.tone,
        generated = report.generated_at.format("%Y-%m-%d %H:%M:%S"),
        dominant = report.profile.dominant_color.hex,
        mood = title_case(report.profile.mood.as_str()),
        brightness = title_case(report.profile.brightness.as_str()),
        palette = palette,
        count = report.creative_count,
        formats = formats,
        captions = report.captions.len(),
    )
}

pub fn write_report(path: &Path, report: &SessionReport<'_>) -> anyhow::Result<()> {
    std::fs::write(path, render_report(report))
        .with_context(|| format!("failed to write {}", path.display()))
}

fn title_case(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::{render_report, title_case, SessionReport};
    use crate::captions::CaptionSet;
    use crate::creative::AspectRatio;
    use crate::profile::{BrandProfile, Brightness, ColorSwatch, Mood};

    #[test]
    fn report_lists_profile_formats_and_counts() {
        let profile = BrandProfile {
            dominant_color: ColorSwatch::new((64, 64, 64)),
            palette: vec![
                ColorSwatch::new((64, 64, 64)),
                ColorSwatch::new((0, 0, 0)),
            ],
            mood: Mood::Luxury,
            brightness: Brightness::Dark,
        };
        let generated_at = Local
            .with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
            .single()
            .unwrap_or_else(Local::now);
        let captions = CaptionSet::default();
        let text = render_report(&SessionReport {
            brand_name: "Acme",
            product_name: "Widget",
            tone: "minimal",
            generated_at,
            profile: &profile,
            creative_count: 2,
            aspect_ratios: &[AspectRatio::Square, AspectRatio::Landscape],
            captions: &captions,
        });

        assert!(text.contains("**Brand:** Acme"));
        assert!(text.contains("**Mood:** Luxury"));
        assert!(text.contains("**Brightness:** Dark"));
        assert!(text.contains("- #404040\n- #000000"));
        assert!(text.contains("Total: 2 images"));
        assert!(text.contains("Formats: 1:1, 16:9"));
        assert!(text.contains("0 caption sets generated"));
    }

    #[test]
    fn title_case_handles_empty() {
        assert_eq!(title_case(""), "");
        assert_eq!(title_case("playful"), "Playful");
    }
}
