//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Frontend config (bind port, optional cert/key)
//!     → listener.rs (bind 0.0.0.0:port)
//!     → tls.rs (load PEM pair, only for TLS frontends)
//!     → Hand off to http::server
//! ```
//!
//! # Design Decisions
//! - TLS is optional per frontend and terminated in-process (rustls)
//! - Plain and TLS frontends share the same request handler

pub mod listener;
pub mod tls;

pub use listener::{bind_frontend, ListenerError};
pub use tls::{load_tls_config, TlsError};
