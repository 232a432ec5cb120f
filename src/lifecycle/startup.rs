//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the route table and the shared origin forwarder
//! - Bind every frontend, then start serving all of them
//! - Stop everything on a termination signal or when a frontend dies
//!
//! # Design Decisions
//! - Fail fast: a port that cannot be bound aborts startup before any
//!   frontend accepts traffic
//! - One task per frontend; frontends share nothing but the forwarder's
//!   connection pool

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::{JoinError, JoinSet};

use crate::config::ProxyConfig;
use crate::http::{FrontendServer, OriginForwarder, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::net::{bind_frontend, ListenerError};
use crate::routing::RouteTable;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("frontend task aborted: {0}")]
    Join(#[from] JoinError),
}

/// Run every configured frontend until SIGINT or SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    run_until(config, signals::wait_for_termination()).await
}

/// Run every configured frontend until `stop` resolves.
pub async fn run_until<F>(config: ProxyConfig, stop: F) -> Result<(), StartupError>
where
    F: Future<Output = ()>,
{
    let table = RouteTable::from_config(&config);
    let forwarder = Arc::new(OriginForwarder::from_config(&config));

    let mut bound = Vec::with_capacity(table.frontends().len());
    for frontend in table.frontends() {
        let listener = bind_frontend(frontend.bind_port).await?;
        bound.push((frontend.clone(), listener));
    }

    let shutdown = Shutdown::new();
    let mut tasks = JoinSet::new();
    for (frontend, listener) in bound {
        let server = FrontendServer::new(frontend, forwarder.clone(), &config);
        tasks.spawn(server.run(listener, shutdown.subscribe()));
    }

    let mut first_error = None;
    tokio::select! {
        _ = stop => {}
        Some(joined) = tasks.join_next() => {
            if let Err(err) = flatten(joined) {
                tracing::error!(error = %err, "Frontend stopped unexpectedly");
                first_error = Some(err);
            }
        }
    }

    shutdown.trigger();
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = flatten(joined) {
            tracing::error!(error = %err, "Frontend failed during shutdown");
            first_error.get_or_insert(err);
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn flatten(joined: Result<Result<(), ServerError>, JoinError>) -> Result<(), StartupError> {
    Ok(joined??)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FrontendConfig, HostConfig};
    use std::time::Duration;

    fn frontend(port: u16) -> FrontendConfig {
        FrontendConfig {
            bind_port: port,
            tls_key_path: None,
            tls_cert_path: None,
            hosts: vec![HostConfig {
                hostname: String::new(),
                paths: vec![],
            }],
        }
    }

    #[tokio::test]
    async fn stops_when_asked() {
        let config = ProxyConfig {
            frontends: vec![frontend(0), frontend(0)],
            ..Default::default()
        };
        let result = run_until(config, tokio::time::sleep(Duration::from_millis(50))).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn taken_port_fails_fast() {
        let holder = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = holder.local_addr().unwrap().port();
        let config = ProxyConfig {
            frontends: vec![frontend(port)],
            ..Default::default()
        };

        let result = run_until(config, std::future::pending()).await;
        assert!(matches!(result, Err(StartupError::Listener(_))));
    }

    #[tokio::test]
    async fn broken_tls_frontend_stops_the_relay() {
        let mut broken = frontend(0);
        broken.tls_cert_path = Some("/nonexistent/cert.pem".into());
        broken.tls_key_path = Some("/nonexistent/key.pem".into());
        let config = ProxyConfig {
            frontends: vec![frontend(0), broken],
            ..Default::default()
        };

        let result = run_until(config, std::future::pending()).await;
        assert!(matches!(result, Err(StartupError::Server(ServerError::Tls { .. }))));
    }
}
