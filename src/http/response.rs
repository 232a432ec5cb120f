//! Response handling and transformation.
//!
//! # Responsibilities
//! - Hold an origin's answer as a [`ResponseDescriptor`]
//! - Rewrite `Location` on 301/302 so redirects point back through the relay
//! - Build the client response: headers, forwarding headers, status, body
//!
//! # Design Decisions
//! - Status below 200 is treated as "no usable response" and answered with
//!   an empty 200 text/plain placeholder
//! - Hop-by-hop headers stripped; everything else copied in order, repeats kept
//! - Body written verbatim (already fully read, never re-encoded)

use std::net::IpAddr;

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{Response, StatusCode};

use crate::http::request::{client_ip_value, is_hop_by_hop, REAL_IP, X_FORWARDED_FOR};
use crate::load_balancer::Backend;
use crate::observability::record_access;

/// Body sent for verbs the relay refuses to forward.
pub const UNSUPPORTED_VERB_BODY: &str = "This method is unsupported by brelay. Sorry.";

/// One origin answer (or a synthetic one built by the relay).
#[derive(Debug, Clone, Default)]
pub struct ResponseDescriptor {
    pub status: u16,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: Bytes,
}

impl ResponseDescriptor {
    /// Fixed 500 answer for verbs outside GET/POST/PUT/DELETE/HEAD.
    pub fn unsupported_verb() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            headers: Vec::new(),
            body: Bytes::from_static(UNSUPPORTED_VERB_BODY.as_bytes()),
        }
    }

    pub fn is_redirect(&self) -> bool {
        self.status == 301 || self.status == 302
    }
}

/// Everything the rewriter needs to know about where the response came from.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    pub frontend_port: u16,
    pub tls: bool,
    /// Hostname of the matched virtual host (may be empty).
    pub hostname: &'a str,
    /// Backend that produced the response, if any.
    pub backend: Option<&'a Backend>,
    pub client_ip: IpAddr,
}

/// Point a redirect target at the relay instead of the backend.
pub fn rewrite_location(value: &str, ctx: &RewriteContext<'_>) -> String {
    let mut rewritten = value.to_string();

    if let Some(backend) = ctx.backend {
        rewritten = rewritten.replace(
            &format!(":{}", backend.port),
            &format!(":{}", ctx.frontend_port),
        );
        if !backend.hostname.is_empty() && !ctx.hostname.is_empty() {
            rewritten = rewritten.replace(&backend.hostname, ctx.hostname);
        }
    }

    if ctx.tls && rewritten.starts_with("http:") {
        rewritten = rewritten.replacen("http:", "https:", 1);
    }

    rewritten
}

/// Turn an origin answer into the response written to the client.
pub fn into_client_response(
    origin: ResponseDescriptor,
    ctx: &RewriteContext<'_>,
) -> Response<Body> {
    let mut response = if origin.status <= 199 {
        tracing::warn!(
            status = origin.status,
            "Origin returned no usable status, sending placeholder"
        );
        let mut placeholder = Response::new(Body::empty());
        placeholder.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain"),
        );
        placeholder
    } else {
        build_from_origin(origin, ctx)
    };

    let ip = client_ip_value(ctx.client_ip);
    response.headers_mut().insert(X_FORWARDED_FOR, ip.clone());
    response.headers_mut().insert(REAL_IP, ip);
    response
}

fn build_from_origin(origin: ResponseDescriptor, ctx: &RewriteContext<'_>) -> Response<Body> {
    let redirect = origin.is_redirect();
    let status = StatusCode::from_u16(origin.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut response = Response::new(Body::from(origin.body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in origin.headers {
        if is_hop_by_hop(&name) {
            continue;
        }

        if redirect && name == header::LOCATION {
            if let Some(target) = value.to_str().ok().map(|v| rewrite_location(v, ctx)) {
                record_access(&format!("handling redirect, sending to {target}"));
                if let Ok(rewritten) = HeaderValue::from_str(&target) {
                    headers.append(name, rewritten);
                    continue;
                }
            }
        }
        headers.append(name, value);
    }

    response
}
