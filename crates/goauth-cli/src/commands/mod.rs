//! CLI command implementations.

mod account;
mod auth;
mod health;

pub use account::{activity, forgot_password, reset_password, two_factor, verify_email};
pub use auth::{login, logout, refresh, register, status};
pub use health::{keep_alive, ping};

use anyhow::{Context, Result};
use auth_config::{Config, Paths};
use identity_client::HttpIdentityClient;
use session_manager::SessionManager;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::debug;

/// Load the configuration, letting `--api-url` win over file and environment.
pub fn load_config(paths: &Paths, api_url: Option<&str>) -> Result<Config> {
    let mut config = Config::load(paths).context("Failed to load configuration")?;
    if let Some(url) = api_url {
        config.api_url = url.to_string();
    }
    Ok(config)
}

/// Build the HTTP client for the configured identity service.
pub fn identity_client(config: &Config) -> Result<HttpIdentityClient> {
    let api_url = config.api_url()?;
    let client = HttpIdentityClient::new(api_url.as_str(), config.request_timeout())?;
    debug!(api_url = %client.api_url(), "Identity client ready");
    Ok(client)
}

/// Build a session manager backed by the session file and hydrate it.
pub async fn session_manager(paths: &Paths, config: &Config) -> Result<SessionManager> {
    paths.ensure_dirs()?;
    let client = identity_client(config)?;
    let store = session_storage::create_file_session_store(paths.session_file());
    let manager = SessionManager::new(Arc::new(client), store);
    manager.initialize().await;
    Ok(manager)
}

/// Prompt for a single line on stdin.
fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
