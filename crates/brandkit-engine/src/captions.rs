use anyhow::{bail, Context, Result};
use brandkit_contracts::captions::{Caption, CaptionSet};
use brandkit_contracts::session::{Tone, DEFAULT_AUDIENCE};
use tracing::{info, warn};

use crate::config::StudioConfig;
use crate::text::{GeminiBackend, TextBackend};
use crate::util::{error_chain_text, truncate_text};

pub const FALLBACK_SOURCE: &str = "fallback";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionBrief {
    pub brand_name: String,
    pub product_name: String,
    pub tone: String,
    pub target_audience: String,
    pub num_variations: usize,
}

impl CaptionBrief {
    pub fn new(brand_name: &str, product_name: &str, tone: &str, num_variations: usize) -> Self {
        Self {
            brand_name: brand_name.to_string(),
            product_name: product_name.to_string(),
            tone: tone.to_string(),
            target_audience: DEFAULT_AUDIENCE.to_string(),
            num_variations,
        }
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.target_audience = audience.to_string();
        self
    }

    fn count(&self) -> usize {
        self.num_variations.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionSource {
    Backend(String),
    Fallback,
}

impl CaptionSource {
    pub fn label(&self) -> &str {
        match self {
            CaptionSource::Backend(name) => name,
            CaptionSource::Fallback => FALLBACK_SOURCE,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CaptionSource::Fallback)
    }
}

/// Produces caption sets from a text backend, or from tone templates when
/// the backend is absent or misbehaves.
pub struct CaptionWriter {
    backend: Option<Box<dyn TextBackend>>,
}

impl CaptionWriter {
    pub fn new(backend: Option<Box<dyn TextBackend>>) -> Self {
        Self { backend }
    }

    pub fn offline() -> Self {
        Self::new(None)
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        match config.text_api_key.as_deref() {
            Some(api_key) => Self::new(Some(Box::new(GeminiBackend::new(
                &config.gemini_api_base,
                &config.text_model,
                api_key,
            )))),
            None => {
                warn!("text API key not set; captions will use templates");
                Self::offline()
            }
        }
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref().map(|backend| backend.name())
    }

    /// Always returns exactly `brief.num_variations` captions (at least one).
    pub fn generate_captions(&self, brief: &CaptionBrief) -> (CaptionSet, CaptionSource) {
        let count = brief.count();
        let Some(backend) = self.backend.as_deref() else {
            return (fallback_captions(brief), CaptionSource::Fallback);
        };

        info!(backend = backend.name(), count, "generating captions");
        let attempt = backend
            .complete(&build_caption_prompt(brief))
            .and_then(|text| {
                parse_caption_response(&text, count).with_context(|| {
                    format!("unusable caption response: {}", truncate_text(&text, 500))
                })
            });
        match attempt {
            Ok(set) => {
                info!(count = set.len(), "captions generated");
                (set, CaptionSource::Backend(backend.name().to_string()))
            }
            Err(err) => {
                warn!(
                    backend = backend.name(),
                    error = %error_chain_text(&err, 1024),
                    "caption generation failed; using templates"
                );
                (fallback_captions(brief), CaptionSource::Fallback)
            }
        }
    }
}

pub fn build_caption_prompt(brief: &CaptionBrief) -> String {
    let count = brief.count();
    let tone = brief.tone.trim();
    format!(
        r#"You are an expert marketing copywriter. Create {count} different ad caption sets for:

Brand: {brand}
Product: {product}
Tone: {tone}
Target Audience: {audience}

For each caption set, provide:
1. Headline (5-7 words, punchy and attention-grabbing)
2. Subheadline (10-15 words, explains the value proposition)
3. CTA (2-4 words, action-oriented)
4. Long Caption (25-40 words, for social media posts)
5. Hashtags (3-5 relevant hashtags)

Format your response as JSON:
{{
  "captions": [
    {{
      "variation": 1,
      "headline": "...",
      "subheadline": "...",
      "cta": "...",
      "long_caption": "...",
      "hashtags": ["...", "..."]
    }},
    ...
  ]
}}

Make sure the tone matches: {tone}
Be creative, persuasive, and authentic. No placeholder text."#,
        brand = brief.brand_name.trim(),
        product = brief.product_name.trim(),
        audience = brief.target_audience.trim(),
    )
}

/// Body of the first ```` ```json ```` fence, else of the first bare fence,
/// else the whole text.
pub fn extract_json_block(text: &str) -> &str {
    let raw = text.trim();
    let fenced = if let Some((_, rest)) = raw.split_once("```json") {
        Some(rest)
    } else {
        raw.split_once("```").map(|(_, rest)| rest)
    };
    match fenced {
        Some(rest) => rest.split("```").next().unwrap_or(rest).trim(),
        None => raw,
    }
}

pub fn parse_caption_response(text: &str, num_variations: usize) -> Result<CaptionSet> {
    let count = num_variations.max(1);
    let mut set: CaptionSet =
        serde_json::from_str(extract_json_block(text)).context("caption JSON did not parse")?;
    if set.captions.len() < count {
        bail!(
            "expected {count} captions, response held {}",
            set.captions.len()
        );
    }
    set.captions.truncate(count);
    if let Some(position) = set.captions.iter().position(|caption| !caption.is_complete()) {
        bail!("caption {} is missing required fields", position + 1);
    }
    for (idx, caption) in set.captions.iter_mut().enumerate() {
        caption.variation = idx as u32 + 1;
    }
    Ok(set)
}

pub fn fallback_captions(brief: &CaptionBrief) -> CaptionSet {
    let template = fallback_template(&brief.brand_name, &brief.product_name, &brief.tone);
    let captions = (1..=brief.count() as u32)
        .map(|variation| Caption {
            variation,
            ..template.clone()
        })
        .collect();
    CaptionSet { captions }
}

fn fallback_template(brand_name: &str, product_name: &str, tone: &str) -> Caption {
    let brand = brand_name.trim();
    let product = product_name.trim();
    let brand_tag = format!(
        "#{}",
        brand.split_whitespace().collect::<Vec<&str>>().concat()
    );
    let caption = |headline: String,
                   subheadline: String,
                   cta: &str,
                   long_caption: String,
                   tags: [&str; 2]| Caption {
        variation: 1,
        headline,
        subheadline,
        cta: cta.to_string(),
        long_caption,
        hashtags: vec![tags[0].to_string(), tags[1].to_string(), brand_tag.clone()],
    };

    match Tone::parse(tone).unwrap_or(Tone::Minimal) {
        Tone::Luxury => caption(
            format!("Elevate Your {product} Experience"),
            format!("Discover the premium quality of {brand}"),
            "Explore Now",
            format!(
                "Experience luxury redefined with {brand}'s {product}. Crafted for those who appreciate excellence."
            ),
            ["#Luxury", "#Premium"],
        ),
        Tone::Playful => caption(
            "Make Every Day Fun!".to_string(),
            format!("{product} that brings joy to your life"),
            "Get Yours",
            format!(
                "Life's too short for boring! {brand}'s {product} adds a spark to your everyday routine."
            ),
            ["#Fun", "#Lifestyle"],
        ),
        Tone::Minimal => caption(
            format!("Simply {product}"),
            "Clean design meets perfect functionality".to_string(),
            "Shop Now",
            format!("Less is more. {brand} brings you {product} with elegant simplicity."),
            ["#Minimalist", "#Design"],
        ),
        Tone::Bold => caption(
            format!("Stand Out With {product}"),
            format!("Make a statement with {brand}"),
            "Be Bold",
            format!(
                "Don't blend in. {brand}'s {product} is for those who dare to be different."
            ),
            ["#Bold", "#BeYou"],
        ),
    }
}

const RULE: &str = "========================================";

/// Plain-text block for console display.
pub fn render_caption(caption: &Caption) -> String {
    format!(
        "{RULE}\nCAPTION VARIATION #{variation}\n{RULE}\n\nHEADLINE\n{headline}\n\nSUBHEADLINE\n{subheadline}\n\nCTA\n{cta}\n\nLONG CAPTION\n{long_caption}\n\nHASHTAGS\n{hashtags}\n{RULE}\n",
        variation = caption.variation,
        headline = caption.headline,
        subheadline = caption.subheadline,
        cta = caption.cta,
        long_caption = caption.long_caption,
        hashtags = caption.hashtags.join(" "),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};

    use super::{
        build_caption_prompt, extract_json_block, fallback_captions, parse_caption_response,
        render_caption, CaptionBrief, CaptionSource, CaptionWriter,
    };
    use crate::config::StudioConfig;
    use crate::text::TextBackend;

    struct ScriptedText {
        reply: Result<String, String>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedText {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing(error: &str) -> Self {
            Self {
                reply: Err(error.to_string()),
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl TextBackend for ScriptedText {
        fn name(&self) -> &str {
            "scripted"
        }

        fn complete(&self, prompt: &str) -> Result<String> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            self.reply.clone().map_err(|err| anyhow!(err))
        }
    }

    fn caption_json(variation: u32, headline: &str) -> String {
        format!(
            r##"{{"variation": {variation}, "headline": "{headline}", "subheadline": "Built for every day",
               "cta": "Shop Now", "long_caption": "A longer story about the product.",
               "hashtags": ["#Widget", "#Daily"]}}"##
        )
    }

    fn brief(tone: &str, count: usize) -> CaptionBrief {
        CaptionBrief::new("Acme Labs", "Widget", tone, count)
    }

    #[test]
    fn fenced_blocks_prefer_json_tag() {
        let tagged = "intro ```text\nnope``` then ```json\n{\"a\":1}\n``` tail";
        assert_eq!(extract_json_block(tagged), "{\"a\":1}");
        let bare = "Here you go:\n```\n{\"b\":2}\n```";
        assert_eq!(extract_json_block(bare), "{\"b\":2}");
        assert_eq!(extract_json_block("  {\"c\":3}  "), "{\"c\":3}");
    }

    #[test]
    fn response_is_truncated_and_renumbered() -> Result<()> {
        let text = format!(
            "```json\n{{\"captions\": [{}, {}, {}]}}\n```",
            caption_json(7, "First"),
            caption_json(3, "Second"),
            caption_json(9, "Third")
        );
        let set = parse_caption_response(&text, 2)?;
        assert_eq!(set.len(), 2);
        assert_eq!(set.captions[0].variation, 1);
        assert_eq!(set.captions[1].variation, 2);
        assert_eq!(set.captions[1].headline, "Second");
        Ok(())
    }

    #[test]
    fn entries_without_variation_are_numbered_in_order() -> Result<()> {
        let text = r##"{"captions":[{"headline":"Meet Widget","subheadline":"Built by Acme","cta":"Shop Now","long_caption":"Widget makes mornings easier.","hashtags":["#Widget"]}]}"##;
        let set = parse_caption_response(text, 1)?;
        assert_eq!(set.len(), 1);
        assert_eq!(set.captions[0].variation, 1);
        assert_eq!(set.captions[0].headline, "Meet Widget");
        Ok(())
    }

    #[test]
    fn short_or_incomplete_responses_are_rejected() {
        let one = format!("{{\"captions\": [{}]}}", caption_json(1, "Only"));
        assert!(parse_caption_response(&one, 2).is_err());

        let blank = format!("{{\"captions\": [{}]}}", caption_json(1, " "));
        assert!(parse_caption_response(&blank, 1).is_err());

        assert!(parse_caption_response("not json at all", 1).is_err());
    }

    #[test]
    fn fallback_matches_tone_and_count() {
        let set = fallback_captions(&brief("Luxury", 3));
        assert_eq!(set.len(), 3);
        let variations: Vec<u32> = set.captions.iter().map(|caption| caption.variation).collect();
        assert_eq!(variations, vec![1, 2, 3]);
        let first = &set.captions[0];
        assert_eq!(first.headline, "Elevate Your Widget Experience");
        assert_eq!(first.hashtags, vec!["#Luxury", "#Premium", "#AcmeLabs"]);
        assert!(set.captions.iter().all(|caption| caption.is_complete()));
    }

    #[test]
    fn unknown_tone_and_zero_count_use_minimal_single_caption() {
        let set = fallback_captions(&brief("corporate", 0));
        assert_eq!(set.len(), 1);
        assert_eq!(set.captions[0].headline, "Simply Widget");
        assert_eq!(set.captions[0].cta, "Shop Now");
    }

    #[test]
    fn backend_failure_falls_back_with_requested_cardinality() {
        let writer = CaptionWriter::new(Some(Box::new(ScriptedText::failing("quota exceeded"))));
        let (set, source) = writer.generate_captions(&brief("bold", 2));
        assert_eq!(source, CaptionSource::Fallback);
        assert_eq!(set.len(), 2);
        assert_eq!(set.captions[1].variation, 2);
        assert!(set.captions.iter().all(|caption| caption.is_complete()));
    }

    #[test]
    fn malformed_backend_reply_falls_back() {
        let writer = CaptionWriter::new(Some(Box::new(ScriptedText::replying("```json\n{oops\n```"))));
        let (set, source) = writer.generate_captions(&brief("playful", 1));
        assert!(source.is_fallback());
        assert_eq!(set.captions[0].headline, "Make Every Day Fun!");
    }

    #[test]
    fn valid_backend_reply_is_used() {
        let backend = ScriptedText::replying(&format!(
            "```json\n{{\"captions\": [{}]}}\n```",
            caption_json(1, "Meet Widget")
        ));
        let prompts = backend.prompts.clone();
        let writer = CaptionWriter::new(Some(Box::new(backend)));
        let (set, source) = writer.generate_captions(&brief("minimal", 1).with_audience("makers"));
        assert_eq!(source.label(), "scripted");
        assert_eq!(set.captions[0].headline, "Meet Widget");

        let sent = prompts.lock().map(|rows| rows.clone()).unwrap_or_default();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Target Audience: makers"));
    }

    #[test]
    fn writer_without_text_key_is_offline() {
        let writer = CaptionWriter::from_config(&StudioConfig::default());
        assert_eq!(writer.backend_name(), None);
        let (set, source) = writer.generate_captions(&brief("minimal", 2));
        assert_eq!(source, CaptionSource::Fallback);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn prompt_names_inputs_and_field_guidance() {
        let prompt = build_caption_prompt(&brief("luxury", 2));
        assert!(prompt.contains("Create 2 different ad caption sets"));
        assert!(prompt.contains("Brand: Acme Labs"));
        assert!(prompt.contains("Target Audience: general consumers"));
        assert!(prompt.contains("Headline (5-7 words"));
        assert!(prompt.contains("\"long_caption\": \"...\""));
    }

    #[test]
    fn rendered_caption_lists_every_field() {
        let set = fallback_captions(&brief("bold", 1));
        let block = render_caption(&set.captions[0]);
        assert!(block.contains("CAPTION VARIATION #1"));
        assert!(block.contains("Stand Out With Widget"));
        assert!(block.contains("#Bold #BeYou #AcmeLabs"));
    }
}
