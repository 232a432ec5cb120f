//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header, URI)
//!     → matcher.rs (last matching host, then last matching path prefix)
//!     → strip prefix from URI
//!     → Return: RouteMatch or RoutingError (404)
//!
//! Route Compilation (at startup):
//!     FrontendConfig[]
//!     → router.rs (Frontend → VirtualHost → PathRule → BackendPool)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Last match wins (configuration order)

pub mod matcher;
pub mod router;

pub use matcher::{resolve, RouteMatch, RoutingError};
pub use router::{Frontend, PathRule, RouteTable, TlsPaths, VirtualHost};
