//! TCP listener for the gRPC endpoint.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Report the actual local address (port 0 binds in tests)
//! - Hand the accept stream to the gRPC server

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured address is not a socket address.
    #[error("Invalid bind address '{address}': {source}")]
    Address {
        address: String,
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(#[from] std::io::Error),
}

/// A bound TCP listener.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to the configured address.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|source| ListenerError::Address {
                address: config.bind_address.clone(),
                source,
            })?;

        Self::from_tcp(TcpListener::bind(addr).await?)
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(inner: TcpListener) -> Result<Self, ListenerError> {
        let local_addr = inner.local_addr()?;
        tracing::info!(address = %local_addr, "Listener bound");
        Ok(Self { inner, local_addr })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stream of accepted connections for the gRPC server.
    pub fn into_incoming(self) -> TcpListenerStream {
        TcpListenerStream::new(self.inner)
    }
}
