//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create one Axum router per frontend, with tracing and the server banner
//! - Serve it over plain TCP or TLS until shutdown is signalled
//! - Dispatch each request: route, buffer, forward with retries, rewrite
//! - Write one access line per answered request
//! - Stamp `X-Forwarded-For` / `Real-IP` on every answer, local ones included
//!
//! # Design Decisions
//! - The handler never fails: routing misses become 404, oversized bodies
//!   413, exhausted retries 502 or 504
//! - The client address comes from the accepted connection, never from headers
//! - The retry sequence lives inside the handler future, so a client
//!   disconnect cancels it

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, request::Parts, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::forwarder::{OriginForwarder, UpstreamError};
use crate::http::request::{client_ip_value, RequestDescriptor, REAL_IP, X_FORWARDED_FOR};
use crate::http::response::{into_client_response, RewriteContext};
use crate::net::{load_tls_config, TlsError};
use crate::observability::{record_access, record_error};
use crate::resilience::RetryPolicy;
use crate::routing::{resolve, Frontend};

/// Value of the `Server` header when the origin did not send one.
pub const SERVER_BANNER: &str = "brelay";

/// Time allowed for in-flight TLS requests after shutdown is signalled.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("frontend on port {port} failed: {source}")]
    Io {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("frontend on port {port} has unusable TLS material: {source}")]
    Tls {
        port: u16,
        #[source]
        source: TlsError,
    },
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub frontend: Arc<Frontend>,
    pub forwarder: Arc<OriginForwarder>,
    pub retry: RetryPolicy,
    pub max_request_bytes: usize,
}

/// HTTP(S) server for one frontend.
pub struct FrontendServer {
    router: Router,
    frontend: Arc<Frontend>,
}

impl FrontendServer {
    pub fn new(
        frontend: Arc<Frontend>,
        forwarder: Arc<OriginForwarder>,
        config: &ProxyConfig,
    ) -> Self {
        let state = AppState {
            frontend: frontend.clone(),
            forwarder,
            retry: RetryPolicy::from(&config.retries),
            max_request_bytes: config.limits.max_request_body_bytes,
        };

        Self {
            router: build_router(state),
            frontend,
        }
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let port = self.frontend.bind_port;
        let io_err = |source| ServerError::Io { port, source };
        let addr = listener.local_addr().map_err(io_err)?;
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        match &self.frontend.tls {
            None => {
                tracing::info!(address = %addr, "Now listening (PLAIN)");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await
                    .map_err(io_err)?;
            }
            Some(tls) => {
                let rustls = load_tls_config(&tls.cert, &tls.key)
                    .await
                    .map_err(|source| ServerError::Tls { port, source })?;

                let handle = axum_server::Handle::new();
                let trigger = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    trigger.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
                });

                tracing::info!(address = %addr, "Now listening (TLS)");
                axum_server::from_tcp_rustls(listener.into_std().map_err(io_err)?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await
                    .map_err(io_err)?;
            }
        }

        tracing::info!(address = %addr, "Frontend stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(proxy_handler))
        .route("/{*path}", any(proxy_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::SERVER,
                    HeaderValue::from_static(SERVER_BANNER),
                )),
        )
}

/// Main proxy handler.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let client_ip = peer.ip();
    let (parts, body) = request.into_parts();
    let original_uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let mut response = dispatch(&state, &parts, body, &original_uri, client_ip).await;

    // 404/413/502/504 are built here and never went through the rewriter
    let ip = client_ip_value(client_ip);
    let headers = response.headers_mut();
    headers.entry(X_FORWARDED_FOR).or_insert_with(|| ip.clone());
    headers.entry(REAL_IP).or_insert(ip);

    record_access(&format!(
        "{} {} {} {}",
        client_ip,
        response.status().as_u16(),
        parts.method,
        original_uri
    ));
    response
}

async fn dispatch(
    state: &AppState,
    parts: &Parts,
    body: Body,
    original_uri: &str,
    client_ip: IpAddr,
) -> Response {
    let frontend = state.frontend.as_ref();
    let host = request_host(parts);

    let route = match resolve(frontend, &host, original_uri) {
        Ok(route) => route,
        Err(err) => {
            record_error(&err.to_string());
            return (StatusCode::NOT_FOUND, "Not Found").into_response();
        }
    };

    let body = match axum::body::to_bytes(body, state.max_request_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            record_error(&format!("Rejected request body for {original_uri}: {err}"));
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let descriptor = RequestDescriptor::new(
        parts.method.clone(),
        route.forward_uri.as_str(),
        client_ip,
        &parts.headers,
        body,
    );

    tracing::debug!(
        host = %host,
        prefix = %route.rule.prefix,
        forward_uri = %descriptor.uri,
        "Route matched"
    );

    let rule = route.rule;
    let forwarder = state.forwarder.as_ref();
    let request = &descriptor;

    let outcome = state
        .retry
        .run(move |attempt| async move {
            let Some(backend) = rule.select() else {
                return Err(UpstreamError::NoBackend);
            };
            match forwarder.forward(backend, request).await {
                Ok(response) => Ok((backend, response)),
                Err(err) => {
                    record_error(&format!(
                        "Error from upstream {backend} (attempt {attempt}): {err}"
                    ));
                    Err(err)
                }
            }
        })
        .await;

    match outcome {
        Ok((backend, origin)) => {
            let ctx = RewriteContext {
                frontend_port: frontend.bind_port,
                tls: frontend.is_tls(),
                hostname: &route.host.hostname,
                backend: Some(backend),
                client_ip,
            };
            into_client_response(origin, &ctx)
        }
        Err(exhausted) => {
            record_error(&format!(
                "Giving up on {} {}: {}",
                parts.method, original_uri, exhausted
            ));
            if exhausted.last_error.is_timeout() {
                (StatusCode::GATEWAY_TIMEOUT, "Gateway Timeout").into_response()
            } else {
                (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
            }
        }
    }
}

/// The `Host` header, or the URI authority for HTTP/2 requests without one.
fn request_host(parts: &Parts) -> String {
    parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BalanceStrategy;
    use crate::load_balancer::{Backend, BackendPool};
    use crate::resilience::UpstreamTimeouts;
    use crate::routing::{PathRule, VirtualHost};
    use axum::body::to_bytes;
    use axum::extract::connect_info::MockConnectInfo;
    use tower::ServiceExt;

    fn state(hosts: Vec<VirtualHost>, max_request_bytes: usize) -> AppState {
        AppState {
            frontend: Arc::new(Frontend {
                bind_port: 8080,
                tls: None,
                hosts,
            }),
            forwarder: Arc::new(OriginForwarder::new(
                UpstreamTimeouts {
                    connect: Duration::from_millis(200),
                    request: Duration::from_millis(200),
                },
                1024,
            )),
            retry: RetryPolicy::new(2, Duration::from_secs(5), 10, 10),
            max_request_bytes,
        }
    }

    fn app(state: AppState) -> Router {
        build_router(state).layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))))
    }

    fn host(name: &str, prefix: &str, backends: Vec<Backend>) -> VirtualHost {
        VirtualHost {
            hostname: name.to_string(),
            paths: vec![PathRule::new(
                prefix,
                BackendPool::new(backends, BalanceStrategy::RoundRobin),
            )],
        }
    }

    #[tokio::test]
    async fn unknown_host_is_404_with_banner() {
        let backends = vec![Backend::new(1, "127.0.0.1", 9, 1)];
        let app = app(state(vec![host("a.example", "/", backends)], 1024));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/x")
                    .header(header::HOST, "b.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::SERVER], SERVER_BANNER);
        assert_eq!(response.headers()["x-forwarded-for"], "10.0.0.1");
        assert_eq!(response.headers()["real-ip"], "10.0.0.1");
    }

    #[tokio::test]
    async fn empty_pool_is_404() {
        let app = app(state(vec![host("", "/", vec![])], 1024));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let backends = vec![Backend::new(1, "127.0.0.1", 9, 1)];
        let app = app(state(vec![host("", "/", backends)], 4));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .body(Body::from("far more than four bytes"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()["x-forwarded-for"], "10.0.0.1");
    }

    #[tokio::test]
    async fn unreachable_pool_is_502() {
        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = dead.local_addr().unwrap().port();
        drop(dead);

        let backends = vec![Backend::new(1, "127.0.0.1", port, 1)];
        let app = app(state(vec![host("", "/", backends)], 1024));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()["real-ip"], "10.0.0.1");
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Bad Gateway");
    }

    #[tokio::test]
    async fn unsupported_verb_never_needs_a_backend() {
        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = dead.local_addr().unwrap().port();
        drop(dead);

        let backends = vec![Backend::new(1, "127.0.0.1", port, 1)];
        let app = app(state(vec![host("", "/", backends)], 1024));
        let response = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-forwarded-for"], "10.0.0.1");
    }

    #[test]
    fn host_falls_back_to_authority() {
        let (parts, _) = Request::builder()
            .uri("https://h2.example/path")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(request_host(&parts), "h2.example");

        let (parts, _) = Request::builder()
            .uri("/path")
            .header(header::HOST, "h1.example:8080")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(request_host(&parts), "h1.example:8080");
    }
}
