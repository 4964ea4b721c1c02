use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use brandkit_contracts::captions::CaptionSet;
use brandkit_contracts::creative::{read_creatives, AspectRatio, CreativeRecord};
use brandkit_contracts::profile::BrandProfile;
use brandkit_engine::session::{CAPTIONS_FILE, CREATIVES_FILE, PROFILE_FILE};

/// Default gallery location: `{session_name}.html` beside the session folder.
pub fn default_gallery_path(session_dir: &Path) -> PathBuf {
    let name = session_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".to_string());
    session_dir.with_file_name(format!("{name}.html"))
}

/// Static results page: palette swatches, creatives grouped by ratio, captions.
pub fn export_gallery_html(session_dir: &Path, out_path: &Path) -> Result<()> {
    let profile = BrandProfile::load(&session_dir.join(PROFILE_FILE))?;
    let creatives_path = session_dir.join(CREATIVES_FILE);
    let creatives = if creatives_path.is_file() {
        read_creatives(&creatives_path)?
    } else {
        Vec::new()
    };
    let captions_path = session_dir.join(CAPTIONS_FILE);
    let captions = if captions_path.is_file() {
        CaptionSet::load(&captions_path)?
    } else {
        CaptionSet::default()
    };
    let title = session_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let html_doc = render_gallery(&title, &profile, &creatives, &captions, |rel| {
        image_src(session_dir, out_path, rel)
    });
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(out_path, html_doc).with_context(|| format!("failed to write {}", out_path.display()))
}

pub fn render_gallery(
    title: &str,
    profile: &BrandProfile,
    creatives: &[CreativeRecord],
    captions: &CaptionSet,
    src_for: impl Fn(&str) -> String,
) -> String {
    let mut swatches = String::new();
    for swatch in &profile.palette {
        swatches.push_str(&format!(
            "<div class='swatch'><div class='chip' style='background:{hex}'></div><code>{hex}</code></div>",
            hex = escape_html(&swatch.hex),
        ));
    }

    let mut sections = String::new();
    for ratio in AspectRatio::ALL {
        let group: Vec<&CreativeRecord> = creatives
            .iter()
            .filter(|record| record.aspect_ratio == ratio)
            .collect();
        if group.is_empty() {
            continue;
        }
        let mut cards = String::new();
        for record in group {
            let badge = if record.placeholder {
                " <span class='badge'>placeholder</span>"
            } else {
                ""
            };
            cards.push_str(&format!(
                "<div class='card'><div class='thumb'><img src='{src}' alt='creative {id}'></div><div class='meta'><div class='vid'>#{id} · variation {variation} · {backend}{badge}</div><div class='prompt'>{prompt}</div></div></div>",
                src = escape_html(&src_for(&record.path)),
                id = record.id,
                variation = record.variation,
                backend = escape_html(&record.backend),
                prompt = escape_html(&record.prompt),
            ));
        }
        sections.push_str(&format!(
            "<h2>{label} ({ratio})</h2>\n  <div class='grid'>{cards}</div>\n  ",
            label = ratio.label(),
            ratio = ratio.as_str(),
        ));
    }

    let mut caption_cards = String::new();
    for caption in &captions.captions {
        caption_cards.push_str(&format!(
            "<div class='caption'><div class='vid'>Variation {variation}</div><h3>{headline}</h3><p class='sub'>{subheadline}</p><p>{long_caption}</p><div class='cta'>{cta}</div><div class='tags'>{hashtags}</div></div>",
            variation = caption.variation,
            headline = escape_html(&caption.headline),
            subheadline = escape_html(&caption.subheadline),
            long_caption = escape_html(&caption.long_caption),
            cta = escape_html(&caption.cta),
            hashtags = escape_html(&caption.hashtags.join(" ")),
        ));
    }

    format!(
        "<!doctype html>\n<html>\n<head>\n  <meta charset='utf-8'>\n  <title>{title}</title>\n  <style>\n    body {{ font-family: Arial, sans-serif; background: #f6f6f6; margin: 0; padding: 20px; }}\n    .palette {{ display: flex; gap: 12px; margin-bottom: 16px; }}\n    .swatch {{ text-align: center; font-size: 12px; }}\n    .chip {{ width: 56px; height: 56px; border-radius: 8px; border: 1px solid #ddd; }}\n    .grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 16px; }}\n    .card, .caption {{ background: white; border-radius: 10px; overflow: hidden; box-shadow: 0 2px 8px rgba(0,0,0,0.08); }}\n    .thumb {{ width: 100%; height: 220px; background: #eee; display: flex; align-items: center; justify-content: center; }}\n    .thumb img {{ max-width: 100%; max-height: 100%; }}\n    .meta, .caption {{ padding: 10px; }}\n    .vid {{ font-weight: bold; font-size: 12px; color: #444; }}\n    .badge {{ background: #c33; color: white; border-radius: 4px; padding: 0 4px; }}\n    .prompt {{ font-size: 12px; margin: 8px 0; color: #555; }}\n    .cta {{ font-weight: bold; color: #0066cc; }}\n    .tags {{ font-size: 12px; color: #777; margin-top: 6px; }}\n  </style>\n</head>\n<body>\n  <h1>{title}</h1>\n  <p>Dominant color <code>{dominant}</code> · mood {mood} · brightness {brightness}</p>\n  <div class='palette'>{swatches}</div>\n  {sections}<h2>Captions</h2>\n  <div class='grid'>{caption_cards}</div>\n</body>\n</html>\n",
        title = escape_html(title),
        dominant = escape_html(&profile.dominant_color.hex),
        mood = profile.mood,
        brightness = profile.brightness,
    )
}

fn image_src(session_dir: &Path, out_path: &Path, rel: &str) -> String {
    let base = out_path.parent().unwrap_or_else(|| Path::new(""));
    let full = match session_dir.strip_prefix(base) {
        Ok(inner) => inner.join(rel),
        Err(_) => session_dir.join(rel),
    };
    full.to_string_lossy().replace('\\', "/")
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}
