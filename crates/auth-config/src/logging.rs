//! Logging initialization for the client.
//!
//! Thin wrapper over the observability crate that points the JSONL sink at
//! the client's log directory.

use crate::Paths;
use observability::LogConfig;

/// Initialize the logging system for the `goauth` binary.
///
/// Logs go to `~/.goauth/logs/goauth.jsonl` as JSON lines; stderr gets a
/// compact copy only when `also_stderr` is set, so command output stays clean.
/// `RUST_LOG` overrides `level`.
///
/// # Example
///
/// ```ignore
/// init_logging("info", &paths, false);
/// tracing::info!("started");
/// ```
pub fn init_logging(level: &str, paths: &Paths, also_stderr: bool) {
    init_logging_for_service("goauth", level, paths, also_stderr);
}

/// Initialize logging with a custom service name.
///
/// The keep-alive loop uses its own service name so its lines can be told
/// apart from interactive commands in the shared log file.
pub fn init_logging_for_service(service_name: &str, level: &str, paths: &Paths, also_stderr: bool) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).to_string().to_lowercase(),
        log_path: Some(paths.log_file()),
        also_stderr,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
