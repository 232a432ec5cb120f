//! Access and error logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Route access and error lines to their own append-only files
//! - Fall back to stdout/stderr when a log file cannot be opened
//!
//! # Design Decisions
//! - Access/error lines are ordinary tracing events on dedicated targets;
//!   per-layer `Targets` filters send each target to its sink
//! - Sink lines are `<RFC3339> :: <line>`, one per event
//! - Everything else goes to a console layer filtered by `RUST_LOG` or the
//!   configured level
//! - Writers are non-blocking; the returned guards flush them on drop

use std::fmt;
use std::fs::OpenOptions;
use std::io;

use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{ChronoUtc, FormatTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::LoggingConfig;

/// Target carrying access-log lines.
pub const ACCESS_TARGET: &str = "brelay::access";

/// Target carrying error-log lines.
pub const ERROR_TARGET: &str = "brelay::error";

/// Append a line to the access log.
pub fn record_access(line: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", line.trim_end_matches('\n'));
}

/// Append a line to the error log.
pub fn record_error(line: &str) {
    tracing::error!(target: ERROR_TARGET, "{}", line.trim_end_matches('\n'));
}

/// Keeps the background log writers alive. Hold for the lifetime of the process.
#[must_use]
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// Formats sink lines as `<RFC3339 timestamp> :: <message>`.
#[derive(Debug, Clone)]
pub struct SinkFormat {
    timer: ChronoUtc,
}

impl Default for SinkFormat {
    fn default() -> Self {
        Self {
            timer: ChronoUtc::rfc_3339(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for SinkFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        write!(writer, " :: ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Initializes the logging system.
///
/// `level_override` (from the command line) takes precedence over the
/// configured level; `RUST_LOG` takes precedence over both.
pub fn init_logging(config: &LoggingConfig, level_override: Option<&str>) -> LogGuards {
    let level = level_override.unwrap_or(config.level.as_str()).to_lowercase();

    let mut console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{level},hyper=warn,h2=warn,rustls=warn"))
    });
    for directive in [format!("{ACCESS_TARGET}=off"), format!("{ERROR_TARGET}=off")] {
        if let Ok(directive) = directive.parse() {
            console_filter = console_filter.add_directive(directive);
        }
    }

    let (access_writer, access_guard) =
        open_sink(config.effective_access_path(), SinkFallback::Stdout);
    let (error_writer, error_guard) =
        open_sink(config.effective_error_path(), SinkFallback::Stderr);

    let access_layer = tracing_subscriber::fmt::layer()
        .event_format(SinkFormat::default())
        .with_writer(access_writer)
        .with_ansi(false)
        .with_filter(Targets::new().with_target(ACCESS_TARGET, Level::TRACE));

    let error_layer = tracing_subscriber::fmt::layer()
        .event_format(SinkFormat::default())
        .with_writer(error_writer)
        .with_ansi(false)
        .with_filter(Targets::new().with_target(ERROR_TARGET, Level::TRACE));

    let console_layer = tracing_subscriber::fmt::layer().with_filter(console_filter);

    if tracing_subscriber::registry()
        .with(console_layer)
        .with(access_layer)
        .with(error_layer)
        .try_init()
        .is_err()
    {
        eprintln!("WARNING: a global tracing subscriber was already installed");
    }

    LogGuards {
        _guards: vec![access_guard, error_guard],
    }
}

#[derive(Debug, Clone, Copy)]
enum SinkFallback {
    Stdout,
    Stderr,
}

fn open_sink(path: &str, fallback: SinkFallback) -> (NonBlocking, WorkerGuard) {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => tracing_appender::non_blocking(file),
        Err(e) => {
            eprintln!("ERROR: Could not open log file {path} for writing: {e}");
            match fallback {
                SinkFallback::Stdout => tracing_appender::non_blocking(io::stdout()),
                SinkFallback::Stderr => tracing_appender::non_blocking(io::stderr()),
            }
        }
    }
}
