mod export;

use std::path::PathBuf;

use anyhow::Result;
use brandkit_contracts::creative::AspectRatio;
use brandkit_contracts::session::{SessionRequest, Tone};
use brandkit_engine::archive::verify_archive;
use brandkit_engine::brand::BrandAnalyzer;
use brandkit_engine::captions::render_caption;
use brandkit_engine::generation::ImageChain;
use brandkit_engine::prompt::{build_prompt, variation_prompt};
use brandkit_engine::{Studio, StudioConfig};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::export::{default_gallery_path, export_gallery_html};

const DEFAULT_LOG_FILTER: &str = "brandkit_engine=info,brandkit_cli=info";

#[derive(Debug, Parser)]
#[command(
    name = "brandkit",
    version,
    about = "Turn a brand logo into ad creatives and captions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a full creative session and its ZIP archive.
    Run(RunArgs),
    /// Print the color profile extracted from a logo.
    Analyze(AnalyzeArgs),
    /// Print the image prompt a session would send.
    Prompt(PromptArgs),
    /// Check that an archive matches its session folder.
    Verify(VerifyArgs),
    /// Write a static HTML gallery for a session folder.
    Export(ExportArgs),
    /// Show which credentials and backends are configured.
    Status,
}

#[derive(Debug, Parser)]
struct RunArgs {
    #[arg(long)]
    logo: PathBuf,
    #[arg(long)]
    brand: String,
    #[arg(long)]
    product: String,
    #[arg(long, default_value = "minimal")]
    tone: Tone,
    #[arg(long)]
    audience: Option<String>,
    #[arg(long, default_value_t = 2)]
    variations: u32,
    #[arg(long = "ratio", value_delimiter = ',', default_value = "1:1,9:16,16:9")]
    ratios: Vec<AspectRatio>,
    #[arg(long, default_value = "output")]
    out: PathBuf,
    #[arg(long)]
    retries: Option<u32>,
    /// Also print each caption set.
    #[arg(long)]
    show_captions: bool,
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    logo: PathBuf,
}

#[derive(Debug, Parser)]
struct PromptArgs {
    #[arg(long)]
    logo: PathBuf,
    #[arg(long)]
    product: String,
    #[arg(long, default_value = "minimal")]
    tone: String,
    /// 1-based variation whose composition hint is appended.
    #[arg(long)]
    variation: Option<usize>,
}

#[derive(Debug, Parser)]
struct VerifyArgs {
    session_dir: PathBuf,
    archive: PathBuf,
}

#[derive(Debug, Parser)]
struct ExportArgs {
    session_dir: PathBuf,
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("brandkit error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "loaded environment file");
    }

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_session(args),
        Command::Analyze(args) => run_analyze(args),
        Command::Prompt(args) => run_prompt(args),
        Command::Verify(args) => run_verify(args),
        Command::Export(args) => run_export(args),
        Command::Status => run_status(),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_session(args: RunArgs) -> Result<i32> {
    let mut config = StudioConfig::from_env().with_output_dir(&args.out);
    if let Some(retries) = args.retries {
        config = config.with_retries(retries);
    }
    let mut request = SessionRequest::new(&args.logo, &args.brand, &args.product, args.tone)
        .with_variations(args.variations)
        .with_aspect_ratios(args.ratios);
    if let Some(audience) = args.audience.as_deref() {
        request = request.with_audience(audience);
    }

    let mut studio = Studio::from_config(config);
    let result = studio.run(&request)?;

    println!("Session folder: {}", result.session_dir.display());
    println!("Archive: {}", result.archive_path.display());
    println!(
        "Creatives: {} ({} placeholder)",
        result.creative_count,
        result
            .creatives
            .iter()
            .filter(|record| record.placeholder)
            .count()
    );
    println!("Captions: {}", result.captions.len());
    if args.show_captions {
        for caption in &result.captions.captions {
            println!("{}", render_caption(caption));
        }
    }
    Ok(0)
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let analyzer = BrandAnalyzer::from_config(&StudioConfig::from_env());
    let analysis = analyzer.analyze(&args.logo);
    let mut payload = serde_json::to_value(&analysis.profile)?;
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("fallback".to_string(), json!(analysis.fallback));
    }
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(0)
}

fn run_prompt(args: PromptArgs) -> Result<i32> {
    let analyzer = BrandAnalyzer::from_config(&StudioConfig::from_env());
    let profile = analyzer.analyze(&args.logo).profile;
    let base = build_prompt(&profile, &args.product, &args.tone);
    let prompt = match args.variation {
        Some(variation) => match variation
            .checked_sub(1)
            .and_then(|idx| variation_prompt(&base, idx))
        {
            Some(prompt) => prompt,
            None => anyhow::bail!("variation must be between 1 and 3 (got {variation})"),
        },
        None => base,
    };
    println!("{prompt}");
    Ok(0)
}

fn run_verify(args: VerifyArgs) -> Result<i32> {
    let report = verify_archive(&args.session_dir, &args.archive)?;
    for name in &report.missing {
        println!("missing from archive: {name}");
    }
    for name in &report.mismatched {
        println!("content differs: {name}");
    }
    for name in &report.unexpected {
        println!("not in session folder: {name}");
    }
    if report.is_ok() {
        println!("Archive OK: {} files match", report.checked);
        Ok(0)
    } else {
        Ok(1)
    }
}

fn run_export(args: ExportArgs) -> Result<i32> {
    let out = args
        .out
        .unwrap_or_else(|| default_gallery_path(&args.session_dir));
    export_gallery_html(&args.session_dir, &out)?;
    println!("Exported to {}", out.display());
    Ok(0)
}

fn run_status() -> Result<i32> {
    let config = StudioConfig::from_env();
    let configured = |value: &Option<String>| if value.is_some() { "set" } else { "missing" };
    println!("Image API key: {}", configured(&config.image_api_key));
    println!("Text API key: {}", configured(&config.text_api_key));
    let chain = ImageChain::from_config(&config);
    println!("Image backends:");
    for descriptor in chain.registry().descriptors() {
        println!(
            "  - {} (retries {}, {:?} resolution)",
            descriptor.name, descriptor.max_retries, descriptor.resolution
        );
    }
    match config.text_api_key {
        Some(_) => println!("Caption backend: {}", config.text_model),
        None => println!("Caption backend: templates"),
    }
    Ok(0)
}
