//! Identity service health checks.
//!
//! `ping` is a one-shot check for scripts. `keep_alive` pings on a fixed
//! interval so a host that idles out inactive services keeps the identity
//! service warm.

use crate::output::{self, OutputFormat};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use identity_client::{HealthStatus, IdentityApi};
use serde_json::json;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Ping `/health` once. Fails on a non-200 status or a transport error.
pub async fn ping(api: &dyn IdentityApi, format: &OutputFormat) -> Result<()> {
    let health = api.health().await?;
    print_health(&health, format);

    if !health.is_healthy() {
        anyhow::bail!("Identity service unhealthy (status {})", health.status);
    }
    Ok(())
}

fn print_health(health: &HealthStatus, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("Status:   {}", health.status);
            if let Some(body) = &health.body {
                println!("Payload:  {}", body);
            }
        }
        OutputFormat::Json => output::print_json(&json!({
            "status": health.status,
            "healthy": health.is_healthy(),
            "payload": health.body,
        })),
    }
}

/// Ping immediately, then every `every`, until Ctrl-C. Every outcome is
/// printed with a timestamp; failures never end the loop.
pub async fn keep_alive(api: &dyn IdentityApi, every: Duration) -> Result<()> {
    info!(interval_secs = every.as_secs(), "Keep-alive started");
    println!("Pinging every {}s. Press Ctrl-C to stop.", every.as_secs());

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = check_once(api).await;
                let line = outcome.line(Utc::now());
                if outcome.is_alive() {
                    println!("{}", line);
                } else {
                    eprintln!("{}", line);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Keep-alive stopped");
                return Ok(());
            }
        }
    }
}

/// Result of one keep-alive ping.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PingOutcome {
    Alive(u16),
    Unhealthy(u16),
    Failed(String),
}

impl PingOutcome {
    fn is_alive(&self) -> bool {
        matches!(self, PingOutcome::Alive(_))
    }

    /// Terminal line for this outcome, stamped with `at`.
    fn line(&self, at: DateTime<Utc>) -> String {
        let ts = at.to_rfc3339_opts(SecondsFormat::Millis, true);
        match self {
            PingOutcome::Alive(status) => format!("[{}] Identity service is alive ({})", ts, status),
            PingOutcome::Unhealthy(status) => {
                format!("[{}] Identity service responded with status {}", ts, status)
            }
            PingOutcome::Failed(error) => format!("[{}] Ping failed: {}", ts, error),
        }
    }
}

async fn check_once(api: &dyn IdentityApi) -> PingOutcome {
    match api.health().await {
        Ok(health) if health.is_healthy() => {
            info!(status = health.status, "Keep-alive ping ok");
            PingOutcome::Alive(health.status)
        }
        Ok(health) => {
            warn!(status = health.status, "Keep-alive ping returned non-200 status");
            PingOutcome::Unhealthy(health.status)
        }
        Err(e) => {
            warn!(error = %e, "Keep-alive ping failed");
            PingOutcome::Failed(e.to_string())
        }
    }
}
