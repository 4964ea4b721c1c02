use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use brandkit_contracts::creative::{write_creatives, AspectRatio, CreativeRecord};
use brandkit_contracts::events::{EventWriter, StudioEvent};
use brandkit_contracts::profile::BrandProfile;
use brandkit_contracts::report::{write_report, SessionReport};
use brandkit_contracts::session::{SessionRequest, SessionResult};
use chrono::{DateTime, Local};
use tracing::{info, warn};
use uuid::Uuid;

use crate::archive::package_session;
use crate::brand::BrandAnalyzer;
use crate::captions::{CaptionBrief, CaptionWriter};
use crate::config::StudioConfig;
use crate::generation::{pause, ImageChain};
use crate::prompt::{build_prompt, variation_prompt, VARIATION_MODIFIERS};
use crate::util::error_chain_text;

pub const PROFILE_FILE: &str = "brand_profile.json";
pub const CREATIVES_FILE: &str = "creatives.json";
pub const CAPTIONS_FILE: &str = "captions.json";
pub const REPORT_FILE: &str = "REPORT.md";

/// Runs the whole pipeline for one request: profile, creatives, captions,
/// report and archive.
pub struct Studio {
    config: StudioConfig,
    analyzer: BrandAnalyzer,
    chain: ImageChain,
    writer: CaptionWriter,
}

impl Studio {
    pub fn new(
        config: StudioConfig,
        analyzer: BrandAnalyzer,
        chain: ImageChain,
        writer: CaptionWriter,
    ) -> Self {
        Self {
            config,
            analyzer,
            chain,
            writer,
        }
    }

    pub fn from_config(config: StudioConfig) -> Self {
        let analyzer = BrandAnalyzer::from_config(&config);
        let chain = ImageChain::from_config(&config);
        let writer = CaptionWriter::from_config(&config);
        Self::new(config, analyzer, chain, writer)
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn run(&mut self, request: &SessionRequest) -> Result<SessionResult> {
        let request = request.validated()?;
        let output_dir = self.config.output_dir.clone();
        let session_dir = create_session_dir(&output_dir, &request.brand_name, Local::now())?;
        let session_name = session_name_of(&session_dir)?;
        let events = EventWriter::new(
            output_dir.join(format!("{session_name}.events.jsonl")),
            Uuid::new_v4().to_string(),
        );
        info!(
            session = %session_dir.display(),
            session_id = events.session_id(),
            "session started"
        );
        events.emit(&StudioEvent::SessionStarted {
            session_dir: session_dir.display().to_string(),
            brand_name: request.brand_name.clone(),
            product_name: request.product_name.clone(),
            tone: request.tone.to_string(),
            variations: request.variations,
            aspect_ratios: request.aspect_ratios.clone(),
        })?;

        let analysis = self.analyzer.analyze(&request.logo);
        let profile = analysis.profile;
        profile.save(&session_dir.join(PROFILE_FILE))?;
        events.emit(&StudioEvent::ProfileExtracted {
            dominant_hex: profile.dominant_color.hex.clone(),
            mood: profile.mood,
            brightness: profile.brightness,
            fallback: analysis.fallback,
        })?;

        let mut creatives = Vec::new();
        if let Err(err) =
            self.generate_creatives(&request, &profile, &session_dir, &events, &mut creatives)
        {
            let error = error_chain_text(&err, 1024);
            warn!(saved = creatives.len(), error = %error, "generation stage failed");
            events.emit(&StudioEvent::GenerationStageFailed {
                error,
                saved: creatives.len(),
            })?;
        }
        write_creatives(&session_dir.join(CREATIVES_FILE), &creatives)?;

        let brief = CaptionBrief::new(
            &request.brand_name,
            &request.product_name,
            request.tone.as_str(),
            request.variations as usize,
        )
        .with_audience(&request.target_audience);
        let (captions, source) = self.writer.generate_captions(&brief);
        captions.save(&session_dir.join(CAPTIONS_FILE))?;
        events.emit(&StudioEvent::CaptionsReady {
            count: captions.len(),
            source: source.label().to_string(),
        })?;

        write_report(
            &session_dir.join(REPORT_FILE),
            &SessionReport {
                brand_name: &request.brand_name,
                product_name: &request.product_name,
                tone: request.tone.as_str(),
                generated_at: Local::now(),
                profile: &profile,
                creative_count: creatives.len(),
                aspect_ratios: &request.aspect_ratios,
                captions: &captions,
            },
        )?;

        let archive_path = output_dir.join(format!("{session_name}.zip"));
        let files = package_session(&session_dir, &archive_path)?;
        info!(archive = %archive_path.display(), files, "session packaged");
        events.emit(&StudioEvent::ArchiveWritten {
            archive_path: archive_path.display().to_string(),
            files,
        })?;
        events.emit(&StudioEvent::SessionFinished {
            creative_count: creatives.len(),
            caption_count: captions.len(),
        })?;

        Ok(SessionResult {
            session_dir,
            archive_path,
            brand_profile: profile,
            creative_count: creatives.len(),
            creatives,
            captions,
        })
    }

    /// Variations are the outer loop and ratios the inner one. Each image is
    /// on disk before the next request goes out.
    fn generate_creatives(
        &self,
        request: &SessionRequest,
        profile: &BrandProfile,
        session_dir: &Path,
        events: &EventWriter,
        creatives: &mut Vec<CreativeRecord>,
    ) -> Result<()> {
        let base_prompt = build_prompt(profile, &request.product_name, request.tone.as_str());
        let variations = (request.variations as usize).min(VARIATION_MODIFIERS.len());
        for variation_idx in 0..variations {
            let prompt = variation_prompt(&base_prompt, variation_idx)
                .ok_or_else(|| anyhow!("no variation template {variation_idx}"))?;
            for &aspect_ratio in &request.aspect_ratios {
                let id = creatives.len() as u32 + 1;
                info!(id, variation = variation_idx + 1, %aspect_ratio, "generating creative");
                let outcome = self.chain.generate(&prompt, aspect_ratio);
                for failure in &outcome.failures {
                    events.emit(&StudioEvent::GenerationAttemptFailed {
                        creative_id: id,
                        backend: failure.backend.clone(),
                        attempt: failure.attempt,
                        error: failure.error.clone(),
                    })?;
                }

                let rel_path = creative_rel_path(id, aspect_ratio);
                let path = session_dir.join(&rel_path);
                outcome
                    .image
                    .save(&path)
                    .with_context(|| format!("failed to save {}", path.display()))?;
                let record = CreativeRecord {
                    id,
                    variation: variation_idx as u32 + 1,
                    aspect_ratio,
                    prompt: prompt.clone(),
                    backend: outcome.backend.clone(),
                    placeholder: outcome.placeholder,
                    width: outcome.image.width(),
                    height: outcome.image.height(),
                    path: rel_path,
                };
                events.emit(&StudioEvent::CreativeSaved {
                    creative_id: record.id,
                    variation: record.variation,
                    aspect_ratio,
                    backend: record.backend.clone(),
                    placeholder: record.placeholder,
                    path: record.path.clone(),
                })?;
                creatives.push(record);
                pause(self.config.pacing.creative_interval);
            }
        }
        Ok(())
    }
}

pub fn creative_rel_path(id: u32, aspect_ratio: AspectRatio) -> String {
    format!(
        "{}/{}",
        aspect_ratio.dir_name(),
        CreativeRecord::file_name(id, aspect_ratio)
    )
}

/// Keeps ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
pub fn sanitize_component(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Creates `{output_dir}/{Brand}_{YYYYmmdd_HHMMSS}` (with `-N` appended on
/// collision) and its per-ratio subfolders.
pub fn create_session_dir(
    output_dir: &Path,
    brand_name: &str,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let stem = format!(
        "{}_{}",
        sanitize_component(brand_name),
        now.format("%Y%m%d_%H%M%S")
    );
    let mut candidate = output_dir.join(&stem);
    let mut suffix = 1;
    while candidate.exists() {
        candidate = output_dir.join(format!("{stem}-{suffix}"));
        suffix += 1;
    }
    for ratio in AspectRatio::ALL {
        let dir = candidate.join(ratio.dir_name());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    Ok(candidate)
}

fn session_name_of(session_dir: &Path) -> Result<String> {
    session_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("session path has no name: {}", session_dir.display()))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use brandkit_contracts::captions::CaptionSet;
    use brandkit_contracts::creative::{read_creatives, AspectRatio};
    use brandkit_contracts::profile::Brightness;
    use brandkit_contracts::session::{InputError, SessionRequest, Tone};
    use chrono::{Local, TimeZone};
    use image::{Rgb, RgbImage};
    use serde_json::Value;

    use super::{create_session_dir, sanitize_component, Studio, CAPTIONS_FILE};
    use crate::archive::verify_archive;
    use crate::brand::BrandAnalyzer;
    use crate::captions::CaptionWriter;
    use crate::config::{Pacing, StudioConfig};
    use crate::generation::tests::FakeBackend;
    use crate::generation::{
        BackendRequest, ImageBackend, ImageBackendRegistry, ImageChain, ResolutionPolicy,
    };

    fn write_logo(dir: &Path) -> anyhow::Result<std::path::PathBuf> {
        let logo = dir.join("logo.png");
        RgbImage::from_pixel(500, 500, Rgb([40, 40, 40])).save(&logo)?;
        Ok(logo)
    }

    /// Returns a valid image, but first blocks the first creative's file path
    /// with a directory so saving it fails.
    struct BlockedPathBackend {
        output: PathBuf,
    }

    impl ImageBackend for BlockedPathBackend {
        fn name(&self) -> &str {
            "blocked"
        }

        fn generate(&self, request: &BackendRequest) -> anyhow::Result<image::DynamicImage> {
            for entry in fs::read_dir(&self.output)? {
                let session = entry?.path();
                if session.is_dir() {
                    fs::create_dir_all(session.join("1x1").join("creative_1_1x1.png"))?;
                }
            }
            Ok(image::DynamicImage::ImageRgb8(RgbImage::new(
                request.width,
                request.height,
            )))
        }
    }

    fn studio(output: &Path, backend: impl ImageBackend + 'static, retries: u32) -> Studio {
        let config = StudioConfig::default()
            .with_output_dir(output)
            .with_pacing(Pacing::none());
        let mut registry = ImageBackendRegistry::new();
        registry.register(backend, retries, ResolutionPolicy::Primary);
        Studio::new(
            config.clone(),
            BrandAnalyzer::from_config(&config),
            ImageChain::new(registry, Pacing::none()),
            CaptionWriter::offline(),
        )
    }

    fn event_types(path: &Path) -> anyhow::Result<Vec<String>> {
        let raw = fs::read_to_string(path)?;
        let mut out = Vec::new();
        for line in raw.lines() {
            let value: Value = serde_json::from_str(line)?;
            out.push(value["type"].as_str().unwrap_or_default().to_string());
        }
        Ok(out)
    }

    #[test]
    fn dark_logo_single_square_session() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let logo = write_logo(temp.path())?;
        let output = temp.path().join("output");
        let mut studio = studio(&output, FakeBackend::succeeding_after("fake", 0), 3);

        let request = SessionRequest::new(&logo, "Acme", "Widget", Tone::Minimal)
            .with_variations(1)
            .with_aspect_ratios(vec![AspectRatio::Square]);
        let result = studio.run(&request)?;

        assert_eq!(result.brand_profile.brightness, Brightness::Dark);
        assert_eq!(result.creative_count, 1);
        assert_eq!(result.creatives[0].aspect_ratio, AspectRatio::Square);
        assert_eq!(result.creatives[0].backend, "fake");
        assert_eq!((result.creatives[0].width, result.creatives[0].height), (1024, 1024));
        assert_eq!(result.captions.len(), 1);

        let square_dir = result.session_dir.join("1x1");
        let pngs: Vec<String> = fs::read_dir(&square_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(pngs, vec!["creative_1_1x1.png"]);
        assert!(result.session_dir.join("9x16").is_dir());

        let captions = CaptionSet::load(&result.session_dir.join(CAPTIONS_FILE))?;
        assert_eq!(captions.captions[0].headline, "Simply Widget");
        assert_eq!(read_creatives(&result.session_dir.join("creatives.json"))?.len(), 1);
        assert!(result.session_dir.join("REPORT.md").is_file());

        let session_name = result
            .session_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        assert!(session_name.starts_with("Acme_"));
        assert_eq!(result.archive_path, output.join(format!("{session_name}.zip")));
        assert!(verify_archive(&result.session_dir, &result.archive_path)?.is_ok());

        let types = event_types(&output.join(format!("{session_name}.events.jsonl")))?;
        assert_eq!(
            types,
            vec![
                "session_started",
                "profile_extracted",
                "creative_saved",
                "captions_ready",
                "archive_written",
                "session_finished",
            ]
        );
        Ok(())
    }

    #[test]
    fn failing_backends_still_fill_every_slot() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let logo = write_logo(temp.path())?;
        let output = temp.path().join("output");
        let mut studio = studio(&output, FakeBackend::failing("fake", "offline"), 2);

        let request = SessionRequest::new(&logo, "Acme Co.", "Widget", Tone::Bold)
            .with_variations(2)
            .with_aspect_ratios(vec![AspectRatio::Portrait, AspectRatio::Landscape]);
        let result = studio.run(&request)?;

        assert_eq!(result.creative_count, 4);
        let order: Vec<(u32, u32, AspectRatio)> = result
            .creatives
            .iter()
            .map(|record| (record.id, record.variation, record.aspect_ratio))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, 1, AspectRatio::Portrait),
                (2, 1, AspectRatio::Landscape),
                (3, 2, AspectRatio::Portrait),
                (4, 2, AspectRatio::Landscape),
            ]
        );
        assert!(result.creatives.iter().all(|record| record.placeholder));
        assert!(result.creatives[2].prompt.ends_with("lifestyle scene with product"));
        assert!(result
            .session_dir
            .join("16x9")
            .join("creative_4_16x9.png")
            .is_file());
        assert_eq!(result.captions.len(), 2);

        let session_name = result
            .session_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        assert!(session_name.starts_with("Acme_Co__"));
        let types = event_types(&output.join(format!("{session_name}.events.jsonl")))?;
        let attempts = types
            .iter()
            .filter(|kind| kind.as_str() == "generation_attempt_failed")
            .count();
        assert_eq!(attempts, 8);
        Ok(())
    }

    #[test]
    fn generation_stage_failure_still_packages_the_session() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let logo = write_logo(temp.path())?;
        let output = temp.path().join("output");
        let backend = BlockedPathBackend {
            output: output.clone(),
        };
        let mut studio = studio(&output, backend, 1);

        let request = SessionRequest::new(&logo, "Acme", "Widget", Tone::Minimal)
            .with_variations(1)
            .with_aspect_ratios(vec![AspectRatio::Square]);
        let result = studio.run(&request)?;

        assert_eq!(result.creative_count, 0);
        assert!(result.creatives.is_empty());
        assert_eq!(result.captions.len(), 1);
        assert!(result.session_dir.join(CAPTIONS_FILE).is_file());
        assert!(result.session_dir.join("REPORT.md").is_file());
        assert!(read_creatives(&result.session_dir.join("creatives.json"))?.is_empty());
        assert!(result.archive_path.is_file());

        let session_name = result
            .session_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let types = event_types(&output.join(format!("{session_name}.events.jsonl")))?;
        assert_eq!(
            types,
            vec![
                "session_started",
                "profile_extracted",
                "generation_stage_failed",
                "captions_ready",
                "archive_written",
                "session_finished",
            ]
        );
        Ok(())
    }

    #[test]
    fn invalid_request_creates_nothing() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let logo = write_logo(temp.path())?;
        let output = temp.path().join("output");
        let mut studio = studio(&output, FakeBackend::succeeding_after("fake", 0), 1);

        let request = SessionRequest::new(&logo, "Acme", "Widget", Tone::Luxury).with_variations(4);
        let err = match studio.run(&request) {
            Ok(_) => anyhow::bail!("expected an input error"),
            Err(err) => err,
        };
        assert_eq!(
            err.downcast_ref::<InputError>(),
            Some(&InputError::VariationsOutOfRange(4))
        );
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn session_dir_names_are_sanitized_and_unique() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let now = Local
            .with_ymd_and_hms(2026, 3, 9, 14, 5, 7)
            .single()
            .ok_or_else(|| anyhow::anyhow!("ambiguous test time"))?;
        let first = create_session_dir(temp.path(), "Tech Style!", now)?;
        let second = create_session_dir(temp.path(), "Tech Style!", now)?;
        let third = create_session_dir(temp.path(), "Tech Style!", now)?;
        assert_eq!(first, temp.path().join("Tech_Style__20260309_140507"));
        assert_eq!(second, temp.path().join("Tech_Style__20260309_140507-1"));
        assert_eq!(third, temp.path().join("Tech_Style__20260309_140507-2"));
        assert!(first.join("1x1").is_dir() && first.join("16x9").is_dir());
        assert_eq!(sanitize_component(" a/b\\c-d_e "), "a_b_c-d_e");
        Ok(())
    }
}
