use chrono::Utc;
use clap::{Parser, Subcommand};
use docsift_core::{
    ArtifactStore, DocumentPipeline, GroqClient, OcrOptions, RunOptions, TextExtractor,
    DEFAULT_OCR_DPI,
};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docsift", version)]
struct Cli {
    /// Directory where run artifacts are written.
    #[arg(long, default_value = "outputs")]
    output_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the extraction pipeline on one PDF and save its artifacts.
    Process {
        /// Path to the PDF (scanned or digital).
        #[arg(long)]
        pdf: String,

        /// Force OCR even when a digital text layer exists.
        #[arg(long, default_value_t = false)]
        force_ocr: bool,

        /// Sampling temperature for the completion service.
        #[arg(long, default_value_t = 0.0)]
        temperature: f32,

        /// Maximum completion tokens.
        #[arg(long, default_value_t = 1500)]
        max_tokens: u32,

        /// Character budget for extracted text inside the prompt.
        #[arg(long, default_value_t = 40_000)]
        max_prompt_chars: usize,

        /// Rasterization DPI for the OCR path.
        #[arg(long, default_value_t = DEFAULT_OCR_DPI)]
        ocr_dpi: u32,
    },
    /// List saved artifacts, newest first.
    Artifacts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let store = ArtifactStore::new(&cli.output_dir);

    match cli.command {
        Command::Process {
            pdf,
            force_ocr,
            temperature,
            max_tokens,
            max_prompt_chars,
            ocr_dpi,
        } => {
            let completion =
                GroqClient::from_env().map_err(|error| anyhow::anyhow!(error.to_string()))?;

            info!(
                version = env!("CARGO_PKG_VERSION"),
                model = completion.model(),
                started_at = %Utc::now().to_rfc3339(),
                "docsift boot"
            );

            let extractor = TextExtractor::new(OcrOptions {
                dpi: ocr_dpi,
                ..OcrOptions::default()
            });
            let mut pipeline =
                DocumentPipeline::new(completion, store).with_extractor(extractor);

            let path = Path::new(&pdf);
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or(&pdf)
                .to_string();
            let options = RunOptions {
                force_ocr,
                temperature,
                max_tokens,
                max_prompt_chars,
            };

            let outcome = pipeline
                .run(path, &filename, &options)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            for diagnostic in &outcome.tables.diagnostics {
                warn!(%diagnostic, "table extraction diagnostic");
            }

            let metadata = outcome.record.metadata();
            println!("filename: {}", metadata.filename.unwrap_or(filename));
            match metadata.page_count {
                Some(pages) => println!("pages: {pages}"),
                None => println!("pages: unknown"),
            }
            println!("fields found: {}", outcome.record.fields().len());
            println!("tables extracted: {}", outcome.tables.len());
            for insight in outcome.record.insights().iter().take(10) {
                println!("insight: {insight}");
            }

            println!("{}", outcome.record.to_json_pretty());

            for artifact in outcome.artifacts {
                println!("saved: {}", artifact.display());
            }
        }
        Command::Artifacts => {
            let artifacts = store
                .list()
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if artifacts.is_empty() {
                println!("no saved artifacts yet");
            }
            for artifact in artifacts {
                println!(
                    "{}  {:.1} KB  {}",
                    artifact.name,
                    artifact.size_bytes as f64 / 1024.0,
                    artifact.modified.to_rfc3339()
                );
            }
        }
    }

    Ok(())
}
