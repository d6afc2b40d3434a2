//! Prompt length external processor.
//!
//! A sidecar the proxy calls over its external-processing gRPC stream.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │              PROMPT LENGTH PROCESSOR                 │
//!    Proxy        │                                                      │
//!    Process()    │  ┌──────────┐   ┌────────────┐   ┌───────────────┐   │
//!   ──────────────┼─▶│   net    │──▶│  ext_proc  │──▶│   ext_proc    │   │
//!   events        │  │ listener │   │ server +   │   │   handler     │   │
//!                 │  └──────────┘   │ service    │   │ (per stream)  │   │
//!                 │                 └────────────┘   └───────┬───────┘   │
//!                 │                                          │           │
//!                 │                                          ▼           │
//!   ◀─────────────┼──────────── instructions ─────────┌───────────────┐  │
//!   (CONTINUE,    │                                   │   classify    │  │
//!    x-prompt-*)  │                                   └───────────────┘  │
//!                 │  ┌────────────────────────────────────────────────┐  │
//!                 │  │  config · lifecycle · observability            │  │
//!                 │  └────────────────────────────────────────────────┘  │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use prompt_length_processor::config::{self, ProcessorConfig};
use prompt_length_processor::lifecycle::startup;
use prompt_length_processor::observability::logging;

/// Annotates proxied requests with their body size.
#[derive(Parser, Debug)]
#[command(name = "prompt-length-processor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override listener.bind_address (e.g. 0.0.0.0:50051)
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ProcessorConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("prompt-length-processor v{} starting", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "Configuration file loaded");
    }

    config::apply_env_overrides(&mut config);
    if let Some(listen) = cli.listen {
        config.listener.bind_address = listen;
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        small_threshold = config.classification.small_threshold,
        medium_threshold = config.classification.medium_threshold,
        large_threshold = config.classification.large_threshold,
        metrics_enabled = config.observability.metrics_enabled,
        "Configuration resolved"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
