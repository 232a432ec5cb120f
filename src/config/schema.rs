//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default location of the access log.
pub const DEFAULT_ACCESS_LOG: &str = "/var/log/brelay/access.log";

/// Default location of the error log.
pub const DEFAULT_ERROR_LOG: &str = "/var/log/brelay/error.log";

/// Configured log paths shorter than this are ignored in favour of the defaults.
const MIN_LOG_PATH_LEN: usize = 2;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listening ports and their routing trees.
    pub frontends: Vec<FrontendConfig>,

    /// Access/error sink locations.
    pub logging: LoggingConfig,

    /// Timeout configuration for upstream calls.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Body size limits.
    pub limits: LimitsConfig,
}

/// One bound port with optional TLS and its virtual hosts.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FrontendConfig {
    /// Port to listen on (all interfaces).
    #[serde(alias = "bindPort")]
    pub bind_port: u16,

    /// Path to the PEM private key.
    #[serde(alias = "tlsKeyPath")]
    pub tls_key_path: Option<String>,

    /// Path to the PEM certificate chain.
    #[serde(alias = "tlsCertPath")]
    pub tls_cert_path: Option<String>,

    /// Virtual hosts, in configuration order.
    pub hosts: Vec<HostConfig>,
}

impl FrontendConfig {
    /// Returns `(cert, key)` when both TLS paths are present and non-empty.
    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        let cert = self.tls_cert_path.as_deref().filter(|p| !p.is_empty())?;
        let key = self.tls_key_path.as_deref().filter(|p| !p.is_empty())?;
        Some((PathBuf::from(cert), PathBuf::from(key)))
    }

    /// True when exactly one of the TLS paths was given.
    pub fn tls_half_configured(&self) -> bool {
        let has_cert = self.tls_cert_path.as_deref().is_some_and(|p| !p.is_empty());
        let has_key = self.tls_key_path.as_deref().is_some_and(|p| !p.is_empty());
        has_cert != has_key
    }
}

/// A virtual host. An empty hostname matches any `Host` header.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HostConfig {
    pub hostname: String,
    pub paths: Vec<PathConfig>,
}

/// URI prefix bound to a pool of backends.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PathConfig {
    /// Literal prefix, matched with `starts_with`.
    pub path: String,

    /// Ordered backend pool.
    pub backends: Vec<BackendConfig>,

    /// Selection strategy for this pool.
    pub balance: BalanceStrategy,
}

/// Backend selection strategy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStrategy {
    /// Plain rotation, weights ignored.
    #[default]
    RoundRobin,
    /// Rotation over a pool where each backend appears `weight` times.
    Weighted,
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend identifier for logging.
    #[serde(default)]
    pub id: i64,

    /// Hostname or IP address, reached over plain HTTP.
    pub hostname: String,

    /// Backend port.
    pub port: u16,

    /// Weight for weighted load balancing (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Access/error sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Access log file.
    #[serde(alias = "accessPath")]
    pub access_path: String,

    /// Error log file.
    #[serde(alias = "errorPath")]
    pub error_path: String,

    /// Console diagnostics level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            access_path: DEFAULT_ACCESS_LOG.to_string(),
            error_path: DEFAULT_ERROR_LOG.to_string(),
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Access log path, or the default when the configured one is too short.
    pub fn effective_access_path(&self) -> &str {
        effective_path(&self.access_path, DEFAULT_ACCESS_LOG)
    }

    /// Error log path, or the default when the configured one is too short.
    pub fn effective_error_path(&self) -> &str {
        effective_path(&self.error_path, DEFAULT_ERROR_LOG)
    }
}

fn effective_path<'a>(configured: &'a str, default: &'a str) -> &'a str {
    let trimmed = configured.trim();
    if trimmed.len() < MIN_LOG_PATH_LEN {
        default
    } else {
        trimmed
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Whole exchange (send + read response) timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of forwarding attempts per request (first try included).
    pub max_attempts: u32,

    /// Base delay between attempts in milliseconds.
    pub backoff_ms: u64,

    /// Upper bound for the delay in milliseconds. Equal to `backoff_ms` gives a fixed interval.
    pub max_backoff_ms: u64,

    /// Random extra delay as a fraction of the computed delay (0.0 disables jitter).
    pub jitter_ratio: f64,

    /// Give up once this much wall time has been spent on a request.
    pub max_elapsed_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 1000,
            max_backoff_ms: 1000,
            jitter_ratio: 0.0,
            max_elapsed_secs: 60,
        }
    }
}

/// Body size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest request body buffered for forwarding.
    pub max_request_body_bytes: usize,

    /// Largest upstream response body accepted.
    pub max_response_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 16 * 1024 * 1024,
            max_response_body_bytes: 64 * 1024 * 1024,
        }
    }
}
