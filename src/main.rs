use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use coincount::server::{self, AppState};
use coincount::{CoinConfig, CoinPipeline, YoloModel, decode_image};

#[derive(Parser)]
#[command(name = "coincount")]
#[command(about = "Detect coins in an image and add up their value")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to a JSON config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the detection model (overrides the config file)
    #[arg(long, global = true, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Minimum confidence for a coin to be counted (overrides the config file)
    #[arg(long, global = true, value_name = "X")]
    min_thresh: Option<f32>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind to
        #[arg(long, default_value = "5000")]
        port: u16,
    },
    /// Count the coins in a single image
    Detect {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,
        /// Print the JSON report instead of a summary
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = Arc::new(load_config(&cli)?);
    let model = YoloModel::load(&config)?;
    let pipeline = CoinPipeline::new(config);

    match cli.command {
        Command::Serve { host, port } => {
            let addr: SocketAddr = format!("{host}:{port}").parse()?;
            let state = Arc::new(AppState {
                pipeline,
                model: Arc::new(model),
            });
            server::serve(state, addr).await?;
        }
        Command::Detect { image_path, json } => {
            tracing::debug!(path = %image_path.display(), "loading image");
            let data = std::fs::read(&image_path)?;
            let img = decode_image(&data)?;
            tracing::debug!(width = img.width(), height = img.height(), "image loaded");

            let result = pipeline.run(&img, &model)?;
            let report = result.to_report();

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("=== Coin Detection Results ===");
                println!("Coins detected: {}", report.count);
                if !report.coins_detected.is_empty() {
                    println!("Coins: {}", report.coins_detected.join(", "));
                }
                println!("Total value: INR {}", report.total_value_inr);
            }
        }
    }

    Ok(())
}

/// Defaults, then the config file, then command-line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<CoinConfig> {
    let mut config = match &cli.config {
        Some(path) => CoinConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e))?,
        None => CoinConfig::default(),
    };

    if let Some(model) = &cli.model {
        config = config.with_model_path(model);
    }
    if let Some(min_thresh) = cli.min_thresh {
        config = config.with_min_thresh(min_thresh);
    }

    config.validate()?;
    Ok(config)
}
