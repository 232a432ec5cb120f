//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (connect/exchange deadlines)
//!     → On transport failure: retries.rs (bounded attempts, backoff.rs delay)
//!     → Exhausted: 502 (or 504 after a timeout)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries are bounded by attempt count and elapsed time
//! - HTTP error statuses from origins are never retried

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{RetryExhausted, RetryPolicy, Verdict};
pub use timeouts::UpstreamTimeouts;
