//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON or TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → routing::RouteTable built once, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
pub use schema::{
    BackendConfig, BalanceStrategy, FrontendConfig, HostConfig, LimitsConfig, LoggingConfig,
    PathConfig, ProxyConfig, RetryConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
