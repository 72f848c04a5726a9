use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mediagen_contracts::config::Config;
use mediagen_contracts::request::{GenerationRequest, MediaKind};
use mediagen_contracts::result::{GenerationResult, GenerationStatus};
use mediagen_engine::{default_registry, FileStore, Orchestrator};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "mediagen", version, about = "Prompt-to-media generation over hosted and local providers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate an image from a text prompt.
    Image(ImageArgs),
    /// Generate a short video from a text prompt or a source frame.
    Video(VideoArgs),
    /// List stored media, newest first.
    Gallery(GalleryArgs),
    /// Remove stale temporary artifacts.
    Cleanup(CleanupArgs),
    /// List registered provider names.
    Providers,
}

#[derive(Debug, Parser)]
struct ImageArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    negative_prompt: Option<String>,
    #[arg(long, default_value = "openai")]
    provider: String,
    #[arg(long, default_value = "1024x1024")]
    size: String,
    #[arg(long)]
    steps: Option<u64>,
    #[arg(long)]
    seed: Option<i64>,
    #[arg(long)]
    quality: Option<u64>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Parser)]
struct VideoArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long, default_value = "runway")]
    provider: String,
    #[arg(long, default_value_t = 5)]
    duration: u64,
    #[arg(long)]
    fps: Option<u64>,
    #[arg(long)]
    resolution: Option<String>,
    /// Source frame for image-to-video.
    #[arg(long)]
    source_image: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Parser)]
struct GalleryArgs {
    /// Restrict to one media kind: image or video.
    #[arg(long)]
    kind: Option<String>,
}

#[derive(Debug, Parser)]
struct CleanupArgs {
    #[arg(long, default_value_t = 24)]
    older_than_hours: u64,
}

fn main() {
    env_logger::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("mediagen error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Command::Image(args) => {
            let as_json = args.json;
            submit(&config, image_request(args), as_json)
        }
        Command::Video(args) => {
            let as_json = args.json;
            submit(&config, video_request(&args), as_json)
        }
        Command::Gallery(args) => run_gallery(&config, args),
        Command::Cleanup(args) => run_cleanup(&config, args),
        Command::Providers => {
            let registry = default_registry(&config);
            for name in registry.names() {
                println!("{name}");
            }
            Ok(0)
        }
    }
}

fn image_request(args: ImageArgs) -> GenerationRequest {
    let mut request = GenerationRequest::new(MediaKind::Image, args.prompt, args.provider)
        .with_param("size", json!(args.size));
    request.negative_prompt = args.negative_prompt;
    if let Some(steps) = args.steps {
        request = request.with_param("steps", json!(steps));
    }
    if let Some(seed) = args.seed {
        request = request.with_param("seed", json!(seed));
    }
    if let Some(quality) = args.quality {
        request = request.with_param("quality", json!(quality));
    }
    request
}

fn video_request(args: &VideoArgs) -> GenerationRequest {
    let mut request =
        GenerationRequest::new(MediaKind::Video, args.prompt.clone(), args.provider.clone())
            .with_param("duration_s", json!(args.duration));
    if let Some(fps) = args.fps {
        request = request.with_param("fps", json!(fps));
    }
    if let Some(resolution) = args.resolution.as_deref() {
        request = request.with_param("resolution", json!(resolution));
    }
    request.source_image = args.source_image.clone();
    request
}

fn submit(config: &Config, mut request: GenerationRequest, as_json: bool) -> Result<i32> {
    for key in config.missing_credentials() {
        log::info!("credential {key} not set; the matching provider will refuse requests");
    }
    let registry = default_registry(config);
    let store = FileStore::new(&config.out_dir)?;

    // Stage the source frame under temp/ so cleanup covers it later.
    if let Some(source) = request.source_image.take() {
        let bytes = std::fs::read(&source)
            .with_context(|| format!("failed reading source image {}", source.display()))?;
        let name = source
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("source.png");
        request.source_image = Some(store.save_temp(&bytes, name)?);
    }

    let mut orchestrator = Orchestrator::new(registry, store);
    let result = orchestrator.submit(request)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print_result(result);
    }
    Ok(match result.status {
        GenerationStatus::Failed => 1,
        _ => 0,
    })
}

fn print_result(result: &GenerationResult) {
    match result.status {
        GenerationStatus::Succeeded => {
            let path = result
                .media_path()
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            println!("succeeded: {path}");
        }
        GenerationStatus::Failed => {
            let message = result.error_message.as_deref().unwrap_or("unknown failure");
            println!("failed: {message}");
        }
        GenerationStatus::Pending => println!("pending: {}", result.id),
    }
}

fn run_gallery(config: &Config, args: GalleryArgs) -> Result<i32> {
    let filter = match args.kind.as_deref() {
        Some("image") => Some(MediaKind::Image),
        Some("video") => Some(MediaKind::Video),
        Some(other) => anyhow::bail!("unknown kind '{other}', expected image or video"),
        None => None,
    };
    let store = FileStore::new(&config.out_dir)?;
    for path in store.list(filter) {
        let size = store.file_size(&path).unwrap_or(0);
        println!("{}\t{size}", path.display());
    }
    Ok(0)
}

fn run_cleanup(config: &Config, args: CleanupArgs) -> Result<i32> {
    let store = FileStore::new(&config.out_dir)?;
    let removed = store.cleanup_temp(Duration::from_secs(args.older_than_hours * 3600));
    println!("removed {removed} temporary file(s)");
    Ok(0)
}
