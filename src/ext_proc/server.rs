//! gRPC server setup.
//!
//! # Responsibilities
//! - Build the `ExternalProcessor` service around the shared classifier
//! - Apply HTTP/2 limits and the request tracing layer
//! - Serve on a bound listener until the shutdown signal fires

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::classify::SizeClassifier;
use crate::config::{ListenerConfig, ProcessorConfig};
use crate::ext_proc::handler::StreamHandler;
use crate::ext_proc::proto::external_processor_server::ExternalProcessorServer;
use crate::ext_proc::service::ExtProcService;
use crate::net::Listener;

/// Error type for serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// gRPC server for the external processor.
pub struct ProcessorServer {
    listener_config: ListenerConfig,
    service: ExtProcService<SizeClassifier>,
}

impl ProcessorServer {
    /// Create a new server with the given configuration.
    pub fn new(config: &ProcessorConfig) -> Self {
        let classifier = SizeClassifier::new(Arc::new(config.classification.clone()));
        Self {
            listener_config: config.listener.clone(),
            service: ExtProcService::new(StreamHandler::new(classifier)),
        }
    }

    /// Serve until `shutdown` fires, then drain in-flight streams.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = listener.local_addr();
        tracing::info!(
            address = %addr,
            max_concurrent_streams = ?self.listener_config.max_concurrent_streams,
            "gRPC server starting"
        );

        tonic::transport::Server::builder()
            .max_concurrent_streams(self.listener_config.max_concurrent_streams)
            .layer(TraceLayer::new_for_grpc())
            .add_service(ExternalProcessorServer::new(self.service))
            .serve_with_incoming_shutdown(listener.into_incoming(), async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining streams");
            })
            .await?;

        tracing::info!("gRPC server stopped");
        Ok(())
    }
}
