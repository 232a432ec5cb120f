//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, route + buffer + dispatch)
//!     → request.rs (RequestDescriptor, upstream header set)
//!     → [routing layer picks the path rule]
//!     → forwarder.rs (one attempt against one backend, retried by resilience)
//!     → response.rs (Location rewrite, forwarding headers)
//!     → Send to client
//! ```

pub mod forwarder;
pub mod request;
pub mod response;
pub mod server;

pub use forwarder::{OriginForwarder, UpstreamError};
pub use request::{RequestDescriptor, Verb};
pub use response::{ResponseDescriptor, RewriteContext};
pub use server::{FrontendServer, ServerError};
