//! TCP listener for frontends.
//!
//! # Responsibilities
//! - Bind each frontend's port on all interfaces
//! - Report bind failures with the offending port
//!
//! # Design Decisions
//! - Every frontend is bound before any of them starts serving, so a port
//!   conflict aborts startup instead of leaving a half-started relay

use std::net::{Ipv4Addr, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Bind `0.0.0.0:port`.
pub async fn bind_frontend(port: u16) -> Result<TcpListener, ListenerError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { port, source })?;

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(address = %local_addr, "Listener bound");
    }
    Ok(listener)
}
