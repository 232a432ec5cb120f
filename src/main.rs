//! BRelay (v1)
//!
//! A multi-frontend reverse proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request          ┌──────────────────────────────────────────────────┐
//!     ────────────────────────┼─▶ net listener ─▶ http server ─▶ routing matcher  │
//!                             │   (plain / TLS)    (per frontend)   host → path    │
//!                             │                                         │         │
//!                             │                                         ▼         │
//!                             │   resilience retry ◀── load_balancer (per path)   │
//!                             │         │                                         │
//!                             │         ▼                                         │
//!     Client Response         │   http forwarder ───────────────────────────────┼──▶ Backend
//!     ◀───────────────────────┼── http response (Location, X-Forwarded-For)      │
//!                             │                                                  │
//!                             │   config · observability · lifecycle             │
//!                             └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use brelay::config::{
    read_config, validate_config, ConfigError, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH,
};
use brelay::observability::{init_logging, record_error};

#[derive(Parser)]
#[command(name = "brelay", version)]
#[command(about = "Multi-frontend HTTP/TLS reverse proxy", long_about = None)]
struct Cli {
    /// Configuration file (JSON, or TOML when it ends in .toml)
    #[arg(short, long, env = CONFIG_ENV_VAR, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Console log level, overrides `logging.level`
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    println!("Starting BRelay");

    let config = match read_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("ERROR: {err}");
            return ExitCode::FAILURE;
        }
    };

    let _guards = init_logging(&config.logging, cli.log_level.as_deref());

    if let Err(errors) = validate_config(&config) {
        let err = ConfigError::Validation(errors);
        tracing::error!(config = %cli.config.display(), error = %err, "Invalid configuration");
        record_error(&err.to_string());
        return ExitCode::FAILURE;
    }

    tracing::info!(
        config = %cli.config.display(),
        frontends = config.frontends.len(),
        request_timeout_secs = config.timeouts.request_secs,
        max_attempts = config.retries.max_attempts,
        "Configuration loaded"
    );

    match brelay::lifecycle::run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Relay stopped");
            record_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}
