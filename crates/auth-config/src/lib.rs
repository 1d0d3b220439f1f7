//! Configuration, filesystem paths, and logging bootstrap for the GoAuth client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_URL, DEFAULT_KEEPALIVE_INTERVAL_SECS, DEFAULT_LOG_LEVEL,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, init_logging_for_service, parse_level};
pub use paths::{Paths, HOME_ENV};
