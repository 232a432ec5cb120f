//! Request handling and transformation.
//!
//! # Responsibilities
//! - Capture the inbound request as a [`RequestDescriptor`]
//! - Decide which verbs may be forwarded and whether they carry a body
//! - Prepare the header set sent to the origin
//!
//! # Design Decisions
//! - Headers are kept as an ordered list of pairs, in arrival order
//! - Client-supplied `Host`, `User-Agent` and forwarding headers are dropped;
//!   `X-Forwarded-For` and `Real-IP` are always the connection's peer address
//! - Hop-by-hop headers and `Content-Length` are not forwarded; the body is
//!   buffered and the client re-frames it

use std::net::IpAddr;

use axum::body::Bytes;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::Method;

/// `X-Forwarded-For`.
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// `Real-IP`.
pub const REAL_IP: HeaderName = HeaderName::from_static("real-ip");

/// Connection-scoped headers that never cross the proxy.
pub const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Verbs the relay forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl Verb {
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Verb::Get),
            Method::POST => Some(Verb::Post),
            Method::PUT => Some(Verb::Put),
            Method::DELETE => Some(Verb::Delete),
            Method::HEAD => Some(Verb::Head),
            _ => None,
        }
    }

    /// POST and PUT forward the client body; the others never do.
    pub fn carries_body(self) -> bool {
        matches!(self, Verb::Post | Verb::Put)
    }

    pub fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Delete => Method::DELETE,
            Verb::Head => Method::HEAD,
        }
    }
}

/// One inbound request, as forwarded to an origin.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub verb: Method,
    /// Origin-relative URI (path prefix already stripped).
    pub uri: String,
    pub client_ip: IpAddr,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: Bytes,
}

impl RequestDescriptor {
    pub fn new(
        verb: Method,
        uri: impl Into<String>,
        client_ip: IpAddr,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            verb,
            uri: uri.into(),
            client_ip,
            headers: headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            body,
        }
    }

    /// Header set for one upstream attempt.
    pub fn upstream_headers(&self) -> HeaderMap {
        let mut out = HeaderMap::with_capacity(self.headers.len() + 2);

        for (name, value) in &self.headers {
            if *name == header::HOST
                || *name == header::USER_AGENT
                || *name == header::CONTENT_LENGTH
                || *name == X_FORWARDED_FOR
                || *name == REAL_IP
                || is_hop_by_hop(name)
            {
                continue;
            }
            out.append(name.clone(), value.clone());
        }

        let ip = client_ip_value(self.client_ip);
        out.insert(X_FORWARDED_FOR, ip.clone());
        out.insert(REAL_IP, ip);
        out
    }
}

/// The client address as a header value.
pub fn client_ip_value(ip: IpAddr) -> HeaderValue {
    // textual IP addresses are always valid header values
    HeaderValue::from_str(&ip.to_string()).unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}
