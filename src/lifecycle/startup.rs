//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate the final configuration
//! - Start the metrics exporter when enabled
//! - Bind the listener and serve until a termination signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener is bound last, after everything it depends on is ready

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, ProcessorConfig};
use crate::ext_proc::{ProcessorServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;

/// Fatal startup or serving failure.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Run the processor until SIGINT/SIGTERM.
pub async fn run(config: ProcessorConfig) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    let _signals = signals::spawn_signal_watcher(shutdown.clone());
    run_until(config, &shutdown).await
}

/// Run the processor until `shutdown` is triggered.
pub async fn run_until(config: ProcessorConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let shutdown_rx = shutdown.subscribe();
    validate_config(&config).map_err(ConfigError::Validation)?;

    let thresholds = &config.classification;
    if !thresholds.is_ordered() {
        tracing::warn!(
            small = thresholds.small_threshold,
            medium = thresholds.medium_threshold,
            large = thresholds.large_threshold,
            "Thresholds are not in ascending order; some size classes are unreachable"
        );
    }

    if config.observability.metrics_enabled {
        // Validated above.
        if let Ok(addr) = config.observability.metrics_address.parse::<SocketAddr>() {
            metrics::init_metrics(addr);
        }
    }

    let listener = Listener::bind(&config.listener).await?;
    let server = ProcessorServer::new(&config);
    server.run(listener, shutdown_rx).await?;

    Ok(())
}
