//! Timeout enforcement.
//!
//! # Responsibilities
//! - Turn the timeout configuration into durations for upstream calls
//!
//! # Design Decisions
//! - Every outbound call has a deadline: connect is bounded by the connector,
//!   the whole exchange by `tokio::time::timeout`
//! - Timed-out requests are retried; exhaustion after a timeout is a 504

use std::time::Duration;

use crate::config::TimeoutConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamTimeouts {
    /// TCP connect deadline.
    pub connect: Duration,
    /// Deadline for sending the request and reading the whole response.
    pub request: Duration,
}

impl From<&TimeoutConfig> for UpstreamTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_secs),
            request: Duration::from_secs(config.request_secs),
        }
    }
}
