//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single origin server from configuration
//! - Provide the plain-HTTP origin URL used by the forwarder
//!
//! # Design Decisions
//! - Immutable after startup; failures are handled by selection/retry, never by
//!   mutating the backend
//! - `weight` is only consulted by the weighted balancer

use std::fmt;

use crate::config::BackendConfig;

/// A single backend server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub id: i64,
    pub hostname: String,
    pub port: u16,
    pub weight: u32,
}

impl Backend {
    pub fn new(id: i64, hostname: impl Into<String>, port: u16, weight: u32) -> Self {
        Self {
            id,
            hostname: hostname.into(),
            port,
            weight,
        }
    }

    /// `http://host:port` prefix; the relay never speaks TLS to origins.
    pub fn origin(&self) -> String {
        format!("http://{}:{}", self.hostname, self.port)
    }
}

impl From<&BackendConfig> for Backend {
    fn from(config: &BackendConfig) -> Self {
        Self::new(config.id, config.hostname.clone(), config.port, config.weight)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}:{}", self.id, self.hostname, self.port)
    }
}
