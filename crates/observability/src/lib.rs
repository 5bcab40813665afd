//! Tracing setup and HTTP request correlation for AgencyDesk binaries.
//!
//! [`init_tracing`] installs the global subscriber: an `EnvFilter` driven by
//! `RUST_LOG`, a stderr layer (compact or JSON) and, when a log directory is
//! configured, a daily-rolling file layer. The request-id helpers tag every
//! HTTP request with `x-request-id` and echo it back on the response.

mod request_id;

pub use request_id::{
    propagate_request_id_layer, set_request_id_layer, trace_layer, RequestSpan,
    REQUEST_ID_HEADER,
};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "warn,agencydesk=info,agencydesk_server=info,agencydesk_db=info";

/// File name prefix for rolled log files (`agencydesk.log.YYYY-MM-DD`).
const LOG_FILE_PREFIX: &str = "agencydesk.log";

/// Output format of the stderr layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Compact,
    /// One JSON object per event, for log shippers.
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `RUST_LOG` if set and valid, otherwise [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Install the global tracing subscriber.
///
/// Returns the file appender's guard when `log_dir` is set. Keep it alive
/// for the life of the process: dropping it flushes and stops the
/// background writer.
pub fn init_tracing(format: LogFormat, log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = match format {
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(format = %format, log_dir = ?log_dir, "Tracing initialized");
    Ok(guard)
}
