//! BRelay: a multi-frontend HTTP/TLS reverse proxy library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::FrontendServer;
pub use lifecycle::Shutdown;
