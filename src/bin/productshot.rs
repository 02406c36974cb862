//! CLI for ProductShot - analyze a product photo and generate marketing images.

use clap::{Args, Parser, Subcommand, ValueEnum};
use productshot::{
    AspectRatio, GeminiClient, GeminiImageModel, Outcome, ProductAnalysis, SourceImage,
    VendorClient, Workflow,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "productshot")]
#[command(about = "Analyze a product photo and generate marketing images with Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the product and suggest styles
    Analyze(AnalyzeArgs),

    /// Analyze, then generate a batch of images in one style
    Generate(GenerateArgs),

    /// List supported aspect ratios
    Ratios,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Product photo (PNG, JPEG, WebP or GIF)
    image: PathBuf,
}

#[derive(Args)]
struct GenerateArgs {
    /// Product photo (PNG, JPEG, WebP or GIF)
    image: PathBuf,

    /// Style id (e.g. style_2) or 1-based position; defaults to the first suggestion
    #[arg(short, long)]
    style: Option<String>,

    /// Aspect ratio
    #[arg(short, long, value_enum, default_value = "16:9")]
    ratio: AspectRatioArg,

    /// Number of images (1-4)
    #[arg(short = 'n', long, default_value_t = 2)]
    count: u32,

    /// Additional instructions for the image model
    #[arg(short, long)]
    instructions: Option<String>,

    /// Directory to save images into
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Use the higher quality image model
    #[arg(long)]
    pro: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "3:4")]
    StandardPortrait,
    #[value(name = "4:3")]
    Standard,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
            AspectRatioArg::Standard => AspectRatio::Standard,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => {
            analyze(args, cli.json).await?;
        }
        Commands::Generate(args) => {
            generate(args, cli.json).await?;
        }
        Commands::Ratios => {
            list_ratios(cli.json)?;
        }
    }

    Ok(())
}

/// Loads the photo and runs analysis, surfacing the user-facing message on failure.
async fn analyzed_workflow(
    path: &Path,
    model: GeminiImageModel,
) -> anyhow::Result<Workflow<GeminiClient>> {
    let image = match SourceImage::load(path).await {
        Ok(image) => image,
        Err(e) => {
            tracing::error!(error = %e, "failed to load source image");
            anyhow::bail!(productshot::workflow::ENCODING_FAILED_MESSAGE);
        }
    };

    let client = GeminiClient::builder().image_model(model).build()?;
    let workflow = Workflow::new(client);
    tracing::debug!(vendor = workflow.client().name(), path = %path.display(), "analyzing product photo");

    if workflow.select_image(image).await.is_err() {
        let message = workflow
            .snapshot()
            .error
            .unwrap_or_else(|| productshot::workflow::ANALYSIS_FAILED_MESSAGE.to_string());
        anyhow::bail!(message);
    }
    Ok(workflow)
}

fn print_analysis(analysis: &ProductAnalysis, selected: Option<&str>) {
    println!("Product: {}", analysis.product_name);
    for feature in &analysis.key_features {
        println!("  - {}", feature);
    }
    println!("\nStyles:");
    for (i, style) in analysis.suggested_styles.iter().enumerate() {
        let marker = if Some(style.id.as_str()) == selected { "*" } else { " " };
        println!("{} {}. {} [{}]", marker, i + 1, style.name, style.id);
        println!("     {}", style.description);
    }
    if analysis.suggested_styles.is_empty() {
        println!("  (no styles suggested)");
    }
}

async fn analyze(args: AnalyzeArgs, json_output: bool) -> anyhow::Result<()> {
    let workflow = analyzed_workflow(&args.image, GeminiImageModel::default()).await?;
    let snapshot = workflow.snapshot();
    let Some(analysis) = snapshot.analysis.as_deref() else {
        anyhow::bail!(productshot::workflow::ANALYSIS_FAILED_MESSAGE);
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(analysis)?);
    } else {
        print_analysis(analysis, snapshot.config.selected_style_id());
    }
    Ok(())
}

/// Resolves `--style` as an id, falling back to a 1-based position.
fn resolve_style(analysis: &ProductAnalysis, wanted: &str) -> Option<String> {
    if let Some(style) = analysis.style(wanted) {
        return Some(style.id.clone());
    }
    let index: usize = wanted.parse().ok()?;
    analysis
        .suggested_styles
        .get(index.checked_sub(1)?)
        .map(|s| s.id.clone())
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let model = if args.pro {
        GeminiImageModel::NanoBananaPro
    } else {
        GeminiImageModel::NanoBanana
    };
    let workflow = analyzed_workflow(&args.image, model).await?;

    if let Some(ref wanted) = args.style {
        let snapshot = workflow.snapshot();
        let analysis = snapshot
            .analysis
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!(productshot::workflow::ANALYSIS_FAILED_MESSAGE))?;
        let Some(id) = resolve_style(analysis, wanted) else {
            anyhow::bail!("Unknown style '{}'. Run `productshot analyze` to list styles.", wanted);
        };
        workflow.select_style(id);
    }

    workflow.set_ratio(args.ratio.into());
    let count = workflow.set_count(args.count).unwrap_or_default();
    if u32::from(count) != args.count {
        eprintln!("Count clamped to {}", count);
    }
    workflow.set_instructions(args.instructions.clone());

    let snapshot = workflow.snapshot();
    let Some(style) = snapshot.selected_style() else {
        anyhow::bail!("No style available for this product; generation is not possible.");
    };
    if !json_output {
        eprintln!(
            "Generating {} image(s) in style '{}' at {} via {}...",
            count,
            style.name,
            snapshot.config.ratio(),
            workflow.client().name()
        );
    }

    match workflow.generate().await {
        Ok(Outcome::Applied) => {}
        Ok(outcome) => anyhow::bail!("Generation did not run ({:?})", outcome),
        Err(_) => {
            let message = workflow
                .snapshot()
                .error
                .unwrap_or_else(|| productshot::workflow::GENERATION_FAILED_MESSAGE.to_string());
            anyhow::bail!(message);
        }
    }

    std::fs::create_dir_all(&args.out)?;
    let gallery = workflow.snapshot().gallery;
    let mut saved = Vec::with_capacity(gallery.len());
    for image in &gallery {
        saved.push(image.save_to_dir(&args.out)?);
    }

    if json_output {
        let images: Vec<_> = gallery
            .iter()
            .zip(&saved)
            .map(|(image, path)| {
                serde_json::json!({
                    "id": image.id,
                    "path": path.display().to_string(),
                    "styleName": image.style_name,
                    "ratio": image.ratio,
                    "timestamp": image.timestamp,
                })
            })
            .collect();
        let result = serde_json::json!({
            "success": true,
            "count": images.len(),
            "images": images,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for path in &saved {
            println!("Saved: {}", path.display());
        }
    }

    Ok(())
}

fn list_ratios(json_output: bool) -> anyhow::Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(&AspectRatio::ALL)?);
    } else {
        println!("Supported aspect ratios:\n");
        for ratio in AspectRatio::ALL {
            let usage = match ratio {
                AspectRatio::Landscape => "banner, header images and brand story",
                AspectRatio::Square => "standard image-and-text modules",
                AspectRatio::Portrait => "mobile placements",
                AspectRatio::StandardPortrait => "product-focused portrait",
                AspectRatio::Standard => "standard landscape",
            };
            println!("  {:<5} {}", ratio, usage);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use productshot::StyleOption;

    fn analysis() -> ProductAnalysis {
        ProductAnalysis {
            product_name: "台灯".into(),
            key_features: vec![],
            visual_description: "A desk lamp".into(),
            suggested_styles: ["style_a", "style_b"]
                .iter()
                .map(|id| StyleOption {
                    id: id.to_string(),
                    name: id.to_string(),
                    description: String::new(),
                    prompt_modifier: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_resolve_style_by_id_or_position() {
        let a = analysis();
        assert_eq!(resolve_style(&a, "style_b").as_deref(), Some("style_b"));
        assert_eq!(resolve_style(&a, "1").as_deref(), Some("style_a"));
        assert_eq!(resolve_style(&a, "0"), None);
        assert_eq!(resolve_style(&a, "3"), None);
        assert_eq!(resolve_style(&a, "missing"), None);
    }

    #[test]
    fn test_ratio_arg_conversion() {
        assert_eq!(AspectRatio::from(AspectRatioArg::StandardPortrait), AspectRatio::StandardPortrait);
        assert_eq!(AspectRatio::from(AspectRatioArg::Landscape).as_str(), "16:9");
    }

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "productshot", "generate", "mug.jpg", "--ratio", "1:1", "-n", "3", "--style", "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.count, 3);
                assert_eq!(AspectRatio::from(args.ratio), AspectRatio::Square);
                assert_eq!(args.style.as_deref(), Some("2"));
            }
            _ => panic!("expected generate"),
        }
        assert!(Cli::try_parse_from(["productshot", "generate", "mug.jpg", "--ratio", "21:9"]).is_err());
    }
}
