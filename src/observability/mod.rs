//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handling produces:
//!     → record_access / record_error (access.log / error.log sinks)
//!     → tracing events with fields (console diagnostics)
//! ```
//!
//! # Design Decisions
//! - One tracing subscriber, three layers (access, error, console)
//! - Log files are append-only and never rotated by the relay

pub mod logging;

pub use logging::{init_logging, record_access, record_error, LogGuards};
