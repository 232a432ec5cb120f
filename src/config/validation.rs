//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Detect frontends that would fight over the same port
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - An empty backend pool is only warned about; requests routed to it fail at runtime

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no frontends configured")]
    NoFrontends,

    #[error("frontend #{index} has bind_port 0")]
    ZeroBindPort { index: usize },

    #[error("bind_port {port} is used by more than one frontend")]
    DuplicateBindPort { port: u16 },

    #[error("backend {id} under path '{path}' has an empty hostname")]
    EmptyBackendHost { path: String, id: i64 },

    #[error("backend {id} under path '{path}' has port 0")]
    ZeroBackendPort { path: String, id: i64 },

    #[error("retries.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("timeouts.{field} must be greater than 0")]
    ZeroTimeout { field: &'static str },
}

/// Check a parsed configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.frontends.is_empty() {
        errors.push(ValidationError::NoFrontends);
    }

    let mut ports = HashSet::new();
    for (index, frontend) in config.frontends.iter().enumerate() {
        if frontend.bind_port == 0 {
            errors.push(ValidationError::ZeroBindPort { index });
        } else if !ports.insert(frontend.bind_port) {
            errors.push(ValidationError::DuplicateBindPort {
                port: frontend.bind_port,
            });
        }

        if frontend.tls_half_configured() {
            tracing::warn!(
                bind_port = frontend.bind_port,
                "Only one of tls_key_path/tls_cert_path set; frontend will serve plain HTTP"
            );
        }

        for host in &frontend.hosts {
            for path in &host.paths {
                if path.backends.is_empty() {
                    tracing::warn!(
                        bind_port = frontend.bind_port,
                        hostname = %host.hostname,
                        path = %path.path,
                        "Path has no backends; matching requests will be rejected"
                    );
                }
                for backend in &path.backends {
                    if backend.hostname.is_empty() {
                        errors.push(ValidationError::EmptyBackendHost {
                            path: path.path.clone(),
                            id: backend.id,
                        });
                    }
                    if backend.port == 0 {
                        errors.push(ValidationError::ZeroBackendPort {
                            path: path.path.clone(),
                            id: backend.id,
                        });
                    }
                }
            }
        }
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "connect_secs",
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "request_secs",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
