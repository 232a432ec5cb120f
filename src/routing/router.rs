//! Route table construction.
//!
//! # Responsibilities
//! - Turn the frontend/host/path configuration into an immutable tree
//! - Give each path rule its own backend pool and rotation cursor
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Configuration order is preserved; matching relies on it
//! - Frontends are handed out as `Arc` so every connection task can share one

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{FrontendConfig, HostConfig, PathConfig, ProxyConfig};
use crate::load_balancer::{Backend, BackendPool};

/// PEM file locations for a TLS frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// URI prefix bound to a backend pool.
#[derive(Debug)]
pub struct PathRule {
    pub prefix: String,
    pool: BackendPool,
}

impl PathRule {
    pub fn new(prefix: impl Into<String>, pool: BackendPool) -> Self {
        Self {
            prefix: prefix.into(),
            pool,
        }
    }

    /// Pick a backend for the next forwarding attempt.
    pub fn select(&self) -> Option<&Backend> {
        self.pool.select()
    }

    pub fn backends(&self) -> &[Backend] {
        self.pool.backends()
    }

    pub fn has_backends(&self) -> bool {
        !self.pool.is_empty()
    }
}

impl From<&PathConfig> for PathRule {
    fn from(config: &PathConfig) -> Self {
        Self::new(config.path.clone(), BackendPool::from(config))
    }
}

/// A virtual host; the empty hostname is the wildcard.
#[derive(Debug)]
pub struct VirtualHost {
    pub hostname: String,
    pub paths: Vec<PathRule>,
}

impl VirtualHost {
    pub fn is_wildcard(&self) -> bool {
        self.hostname.is_empty()
    }
}

impl From<&HostConfig> for VirtualHost {
    fn from(config: &HostConfig) -> Self {
        Self {
            hostname: config.hostname.clone(),
            paths: config.paths.iter().map(PathRule::from).collect(),
        }
    }
}

/// One listening port and its routing tree.
#[derive(Debug)]
pub struct Frontend {
    pub bind_port: u16,
    pub tls: Option<TlsPaths>,
    pub hosts: Vec<VirtualHost>,
}

impl Frontend {
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }
}

impl From<&FrontendConfig> for Frontend {
    fn from(config: &FrontendConfig) -> Self {
        Self {
            bind_port: config.bind_port,
            tls: config
                .tls_paths()
                .map(|(cert, key)| TlsPaths { cert, key }),
            hosts: config.hosts.iter().map(VirtualHost::from).collect(),
        }
    }
}

/// All frontends of the process.
#[derive(Debug, Default)]
pub struct RouteTable {
    frontends: Vec<Arc<Frontend>>,
}

impl RouteTable {
    pub fn from_config(config: &ProxyConfig) -> Self {
        let frontends = config
            .frontends
            .iter()
            .map(|fe| Arc::new(Frontend::from(fe)))
            .collect();
        Self { frontends }
    }

    pub fn frontends(&self) -> &[Arc<Frontend>] {
        &self.frontends
    }
}
