//! Upstream calls to origin servers.
//!
//! # Responsibilities
//! - Translate a [`RequestDescriptor`] into a plain-HTTP request to one backend
//! - Bound the exchange with connect and request timeouts
//! - Translate the origin response back into a [`ResponseDescriptor`]
//!
//! # Design Decisions
//! - One pooled hyper client shared by every frontend
//! - Unsupported verbs are answered locally with a synthetic 500 and never
//!   leave the process
//! - Any transport problem is an `Err`; an HTTP error status is an `Ok`

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::http::request::{RequestDescriptor, Verb};
use crate::http::response::ResponseDescriptor;
use crate::load_balancer::Backend;
use crate::observability::record_error;
use crate::resilience::UpstreamTimeouts;

/// Failure to obtain a usable answer from an origin. Always retryable.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream target {target}: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: axum::http::Error,
    },

    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read upstream response body: {0}")]
    Body(#[source] axum::Error),

    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("no backend available")]
    NoBackend,
}

impl UpstreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Timeout(_))
    }
}

/// Sends requests to backends.
#[derive(Debug, Clone)]
pub struct OriginForwarder {
    client: Client<HttpConnector, Body>,
    timeouts: UpstreamTimeouts,
    max_response_bytes: usize,
}

impl OriginForwarder {
    pub fn new(timeouts: UpstreamTimeouts, max_response_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeouts.connect));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            timeouts,
            max_response_bytes,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(
            UpstreamTimeouts::from(&config.timeouts),
            config.limits.max_response_body_bytes,
        )
    }

    /// Forward one attempt of `request` to `backend`.
    pub async fn forward(
        &self,
        backend: &Backend,
        request: &RequestDescriptor,
    ) -> Result<ResponseDescriptor, UpstreamError> {
        let Some(verb) = Verb::from_method(&request.verb) else {
            record_error(&format!("Unsupported verb {}", request.verb));
            return Ok(ResponseDescriptor::unsupported_verb());
        };

        let target = format!("{}{}", backend.origin(), request.uri);
        let body = if verb.carries_body() {
            Body::from(request.body.clone())
        } else {
            Body::empty()
        };

        let mut upstream = Request::builder()
            .method(verb.method())
            .uri(target.as_str())
            .body(body)
            .map_err(|source| UpstreamError::InvalidTarget {
                target: target.clone(),
                source,
            })?;
        *upstream.headers_mut() = request.upstream_headers();

        tracing::debug!(
            backend = %backend,
            method = %request.verb,
            target = %target,
            "Forwarding to origin"
        );

        match tokio::time::timeout(self.timeouts.request, self.exchange(upstream)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(self.timeouts.request)),
        }
    }

    async fn exchange(&self, request: Request<Body>) -> Result<ResponseDescriptor, UpstreamError> {
        let response: hyper::Response<Incoming> = self.client.request(request).await?;
        let (parts, body) = response.into_parts();

        let body = axum::body::to_bytes(Body::new(body), self.max_response_bytes)
            .await
            .map_err(UpstreamError::Body)?;

        Ok(ResponseDescriptor {
            status: parts.status.as_u16(),
            headers: parts
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            body,
        })
    }
}
