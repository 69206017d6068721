use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docsort::app::AppState;
use docsort::config::AppConfig;
use docsort::{pipeline, scan, watch};

#[derive(Parser)]
#[command(
    name = "processor",
    about = "Sort scanned document images into folders by type and serial number"
)]
struct Cli {
    /// Folder containing the document images
    input_dir: PathBuf,

    /// Folder that receives the sorted files (default: sorted_documents)
    #[arg(short = 'o', long = "output_directory", alias = "output-dir")]
    output_directory: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Keep running and process files as they appear in the input folder
    #[arg(short, long)]
    watch: bool,

    /// Quiet period in milliseconds before a new file is picked up
    #[arg(long)]
    debounce_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.output_directory {
        config.output.root = dir;
    }
    if let Some(ms) = cli.debounce_ms {
        config.watch.debounce_ms = ms;
    }

    scan::ensure_input_dir(&cli.input_dir)?;

    let state = Arc::new(AppState::new(config)?);
    pipeline::prepare_output_root(&state).await?;

    tracing::info!(
        input = %cli.input_dir.display(),
        output = %state.organizer.output_root().display(),
        model = %state.config.classifier.model,
        watch = cli.watch,
        "Starting document processor"
    );

    let summary = if cli.watch {
        watch::run_watch(Arc::clone(&state), &cli.input_dir).await?
    } else {
        pipeline::process_directory(&state, &cli.input_dir).await?
    };

    tracing::info!(
        sorted = summary.sorted,
        quarantined = summary.quarantined,
        errored = summary.errored,
        failed_dir = %state.organizer.failure_dir().display(),
        "Processing complete"
    );

    Ok(())
}
