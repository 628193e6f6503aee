//! CLI for Visionary - generate and edit images from text prompts.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use visionary::repl::Repl;
use visionary::session::UNKNOWN_ERROR_MESSAGE;
use visionary::{
    AppState, AspectRatio, DataUri, GeminiModel, GeminiProvider, GenerationMode, ImageProvider,
    ImagenModel, SubmitOutcome,
};

#[derive(Parser)]
#[command(name = "visionary")]
#[command(about = "Turn words into images with Imagen, edit them with Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Args)]
struct ProviderArgs {
    /// Google API key (falls back to GEMINI_API_KEY, then API_KEY)
    #[arg(long, global = true, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the Generative Language API
    #[arg(long, global = true, env = "VISIONARY_API_BASE")]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 120)]
    timeout: u64,

    /// Model for text-to-image
    #[arg(long, global = true, value_enum, default_value = "imagen-4")]
    imagen_model: ImagenModelArg,

    /// Model for edits
    #[arg(long, global = true, value_enum, default_value = "nano-banana")]
    gemini_model: GeminiModelArg,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a text prompt
    Generate(GenerateArgs),

    /// Edit an existing image following a text instruction
    Edit(EditArgs),

    /// Start an interactive session with history
    Interactive(InteractiveArgs),

    /// Check that the API key and models are usable
    Check,

    /// List supported aspect ratios
    Ratios,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Aspect ratio of the generated image
    #[arg(short, long, value_enum, default_value = "1:1")]
    aspect_ratio: AspectRatioArg,

    /// Output file or directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

#[derive(Args)]
struct EditArgs {
    /// Description of the changes
    prompt: String,

    /// Image to edit
    #[arg(short, long)]
    input: PathBuf,

    /// Output file or directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

#[derive(Args)]
struct InteractiveArgs {
    /// Directory for downloaded images
    #[arg(long, default_value = ".")]
    save_dir: PathBuf,

    /// Save every new image as soon as it arrives
    #[arg(long)]
    auto_save: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "4:3")]
    StandardLandscape,
    #[value(name = "3:4")]
    StandardPortrait,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::StandardLandscape => AspectRatio::StandardLandscape,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImagenModelArg {
    #[value(name = "imagen-4")]
    Imagen4,
    #[value(name = "imagen-4-ultra")]
    Imagen4Ultra,
    #[value(name = "imagen-4-fast")]
    Imagen4Fast,
}

impl From<ImagenModelArg> for ImagenModel {
    fn from(arg: ImagenModelArg) -> Self {
        match arg {
            ImagenModelArg::Imagen4 => ImagenModel::Imagen4,
            ImagenModelArg::Imagen4Ultra => ImagenModel::Imagen4Ultra,
            ImagenModelArg::Imagen4Fast => ImagenModel::Imagen4Fast,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GeminiModelArg {
    NanoBanana,
    NanoBananaPro,
}

impl From<GeminiModelArg> for GeminiModel {
    fn from(arg: GeminiModelArg) -> Self {
        match arg {
            GeminiModelArg::NanoBanana => GeminiModel::NanoBanana,
            GeminiModelArg::NanoBananaPro => GeminiModel::NanoBananaPro,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_provider(args: &ProviderArgs) -> visionary::Result<GeminiProvider> {
    let mut builder = GeminiProvider::builder()
        .imagen_model(args.imagen_model.into())
        .gemini_model(args.gemini_model.into())
        .timeout(Duration::from_secs(args.timeout));
    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = args.base_url {
        builder = builder.base_url(url);
    }
    builder.build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => {
            let provider = build_provider(&cli.provider)?;
            let mut state = AppState::new();
            state.set_prompt(args.prompt);
            state.set_aspect_ratio(args.aspect_ratio.into());
            run_once(&provider, &mut state, &args.output, cli.json).await?;
        }
        Commands::Edit(args) => {
            let provider = build_provider(&cli.provider)?;
            let source = DataUri::from_file(&args.input).await?;
            let mut state = AppState::new();
            state.set_mode(GenerationMode::Edit);
            state.set_source_image(source);
            state.set_prompt(args.prompt);
            run_once(&provider, &mut state, &args.output, cli.json).await?;
        }
        Commands::Interactive(args) => {
            let provider = build_provider(&cli.provider)?;
            let mut repl = Repl::new(provider, args.save_dir).with_auto_save(args.auto_save);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            repl.run(stdin, tokio::io::stdout()).await?;
        }
        Commands::Check => {
            let provider = build_provider(&cli.provider)?;
            check(&provider, cli.json).await?;
        }
        Commands::Ratios => {
            list_ratios(cli.json)?;
        }
    }

    Ok(())
}

async fn run_once(
    provider: &GeminiProvider,
    state: &mut AppState,
    output: &std::path::Path,
    json_output: bool,
) -> anyhow::Result<()> {
    let mode = state.mode();
    if !json_output {
        eprintln!("{}", mode.progress_label());
    }

    let message = match state.submit(provider).await? {
        SubmitOutcome::Created(_) => None,
        SubmitOutcome::Failed(message) => Some(message),
    };
    if let Some(message) = message {
        if json_output {
            let result = serde_json::json!({
                "success": false,
                "mode": mode.to_string(),
                "error": message,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        anyhow::bail!(message);
    }

    let image = state
        .current_image()
        .ok_or_else(|| anyhow::anyhow!(UNKNOWN_ERROR_MESSAGE))?;
    let path = image.save_to(output)?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "mode": mode.to_string(),
            "id": image.id,
            "prompt": image.prompt,
            "aspect_ratio": image.aspect_ratio,
            "mime_type": image.image_url.mime_type(),
            "output": path.display().to_string(),
            "created_at": image.created_at,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Saved image: {} via {}", path.display(), provider.name());
    }

    Ok(())
}

async fn check(provider: &GeminiProvider, json_output: bool) -> anyhow::Result<()> {
    let result = provider.health_check().await;

    if json_output {
        let value = serde_json::json!({
            "provider": provider.name(),
            "imagen_model": provider.imagen_model().as_str(),
            "gemini_model": provider.gemini_model().as_str(),
            "ok": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match &result {
            Ok(()) => println!(
                "✓ {} ({}, {})",
                provider.name(),
                provider.imagen_model().as_str(),
                provider.gemini_model().as_str()
            ),
            Err(e) => println!("✗ {}: {}", provider.name(), e),
        }
    }

    result.map_err(Into::into)
}

fn list_ratios(json_output: bool) -> anyhow::Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(&AspectRatio::ALL)?);
    } else {
        println!("Aspect ratios (text-to-image only):");
        for ratio in AspectRatio::ALL {
            let default = if ratio == AspectRatio::default() {
                " (default)"
            } else {
                ""
            };
            println!("  {}{}", ratio, default);
        }
    }
    Ok(())
}
