//! Route matching logic.
//!
//! # Responsibilities
//! - Match the Host header against virtual hosts
//! - Match the request URI against path prefixes
//! - Strip the matched prefix before forwarding
//!
//! # Design Decisions
//! - Last match wins for both hosts and paths (configuration order matters)
//! - Host values are compared verbatim; an empty hostname is a wildcard
//! - Prefixes are literal `starts_with` tests, not path-segment aware
//! - No regex to guarantee O(n) matching

use thiserror::Error;

use crate::routing::router::{Frontend, PathRule, VirtualHost};

/// Why a request could not be routed. Always answered with 404.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("no host entry matches hostname '{0}'")]
    UnknownHost(String),

    #[error("no path matches uri '{}' (known prefixes: {})", .uri, .known.join(", "))]
    UnknownPath { uri: String, known: Vec<String> },

    #[error("path '{prefix}' matched uri '{uri}' but has no backends")]
    NoBackends { uri: String, prefix: String },
}

/// Result of routing one request.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub host: &'a VirtualHost,
    pub rule: &'a PathRule,
    /// URI to send to the backend, prefix removed.
    pub forward_uri: String,
}

/// Resolve host, then path, then compute the forwarded URI.
pub fn resolve<'a>(
    frontend: &'a Frontend,
    host_header: &str,
    uri: &str,
) -> Result<RouteMatch<'a>, RoutingError> {
    let host = match_host(&frontend.hosts, host_header)?;
    let rule = match_path(&host.paths, uri)?;

    if !rule.has_backends() {
        return Err(RoutingError::NoBackends {
            uri: uri.to_string(),
            prefix: rule.prefix.clone(),
        });
    }

    Ok(RouteMatch {
        host,
        rule,
        forward_uri: strip_prefix(uri, &rule.prefix),
    })
}

/// The last host whose name equals `host_header`, or whose name is empty.
pub fn match_host<'a>(
    hosts: &'a [VirtualHost],
    host_header: &str,
) -> Result<&'a VirtualHost, RoutingError> {
    hosts
        .iter()
        .rev()
        .find(|h| h.is_wildcard() || h.hostname == host_header)
        .ok_or_else(|| RoutingError::UnknownHost(host_header.to_string()))
}

/// The last rule whose prefix starts the URI.
pub fn match_path<'a>(paths: &'a [PathRule], uri: &str) -> Result<&'a PathRule, RoutingError> {
    paths
        .iter()
        .rev()
        .find(|p| uri.starts_with(p.prefix.as_str()))
        .ok_or_else(|| RoutingError::UnknownPath {
            uri: uri.to_string(),
            known: paths.iter().map(|p| p.prefix.clone()).collect(),
        })
}

/// Remove the first occurrence of `prefix` and make sure the result is rooted.
pub fn strip_prefix(uri: &str, prefix: &str) -> String {
    let stripped = if prefix.is_empty() {
        uri.to_string()
    } else {
        uri.replacen(prefix, "", 1)
    };

    if stripped.starts_with('/') {
        stripped
    } else {
        format!("/{stripped}")
    }
}
