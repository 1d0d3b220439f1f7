//! # Observability
//!
//! Logging setup shared by the GoAuth client crates.
//!
//! Library crates never configure logging themselves. They emit events with
//! the standard `tracing` macros and leave sinks to the binary, which calls
//! [`init_with_config`] once at startup.
//!
//! When a log file is configured, every event is appended to it as one JSON
//! object per line (see [`LogEntry`]). Field values that look like
//! credentials are redacted before they are written, so a stray
//! `access_token = %token` in a log call never reaches disk.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "goauth".into(),
//!         default_level: "debug".into(),
//!         log_path: Some(std::path::PathBuf::from("/tmp/goauth.jsonl")),
//!         also_stderr: true,
//!     });
//!
//!     tracing::info!("ready");
//! }
//! ```

mod json_layer;
mod redact;
mod writer;

pub use json_layer::{JsonLayer, LogEntry};
pub use redact::{is_sensitive_key, sanitize_value, REDACTED};
pub use writer::{LineWriter, LogFile};

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "goauth", "keep-alive").
    /// Included in every JSON log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// JSONL log file. When `None`, only the stderr layer is installed.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

/// Initialize logging with custom configuration.
///
/// Installing a global subscriber twice is not an error here: the second call
/// is ignored, which keeps tests that share a process from tripping over each
/// other. If the log file cannot be opened the file layer is skipped and a
/// warning is emitted through whatever layers remain.
pub fn init_with_config(config: LogConfig) {
    let mut file_error = None;

    let json_layer = config.log_path.as_ref().and_then(|path| {
        match LogFile::open(path) {
            Ok(sink) => Some(
                JsonLayer::new(config.service_name.clone(), sink)
                    .with_filter(env_filter(&config.default_level)),
            ),
            Err(e) => {
                file_error = Some((path.clone(), e));
                None
            }
        }
    });

    // Without a file the stderr layer is the only sink, so it is forced on.
    let stderr_layer = if config.also_stderr || json_layer.is_none() {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_writer(io::stderr)
                .with_filter(env_filter(&config.default_level)),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    match (file_error, &config.log_path) {
        (Some((path, e)), _) => {
            tracing::warn!(
                log_path = %path.display(),
                error = %e,
                "could not open log file, logging to stderr only"
            );
        }
        (None, Some(path)) => {
            tracing::debug!(
                service = %config.service_name,
                log_path = %path.display(),
                "observability initialized"
            );
        }
        (None, None) => {}
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
