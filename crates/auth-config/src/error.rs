//! Failures while locating or reading the client's settings.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither `GOAUTH_HOME` nor a home directory is available.
    #[error("cannot locate the goauth directory: set GOAUTH_HOME or HOME")]
    NoHomeDir,

    #[error("cannot create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file exists but is not a JSON object of known settings.
    #[error("malformed config file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid api_url: {0}")]
    InvalidApiUrl(#[from] url::ParseError),

    /// `api_url` parsed but does not use http or https.
    #[error("api_url must use http or https, got {0}")]
    UnsupportedScheme(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
