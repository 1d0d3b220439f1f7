//! Account maintenance commands.

use crate::output::{self, OutputFormat};
use anyhow::Result;
use session_manager::SessionManager;

pub async fn forgot_password(
    manager: &SessionManager,
    email: &str,
    format: &OutputFormat,
) -> Result<()> {
    manager.forgot_password(email).await?;
    output::print_success(
        &format!("If {} has an account, a reset link is on its way", email),
        format,
    );
    Ok(())
}

/// Prompt for the new password, then complete a password reset.
pub async fn reset_password(
    manager: &SessionManager,
    token: &str,
    format: &OutputFormat,
) -> Result<()> {
    let password = rpassword::prompt_password("New password: ")?;
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }
    manager.reset_password(token, &password).await?;
    output::print_success("Password updated. Log in with the new password.", format);
    Ok(())
}

pub async fn verify_email(
    manager: &SessionManager,
    token: &str,
    format: &OutputFormat,
) -> Result<()> {
    manager.verify_email(token).await?;
    output::print_success("Email verified", format);
    Ok(())
}

/// List recent account activity.
pub async fn activity(manager: &SessionManager, format: &OutputFormat) -> Result<()> {
    let activities = manager.activity_log().await?;

    match format {
        OutputFormat::Text => {
            if activities.is_empty() {
                println!("No activity recorded.");
                return Ok(());
            }
            output::print_heading("Recent activity");
            for entry in &activities {
                let ip = entry.ip.as_deref().unwrap_or("-");
                println!(
                    "  {:<26} {:<16} {:<15} {}",
                    entry.timestamp, entry.kind, ip, entry.description
                );
            }
        }
        OutputFormat::Json => output::print_json(&activities),
    }
    Ok(())
}

/// Turn two-factor authentication on or off.
pub async fn two_factor(
    manager: &SessionManager,
    enabled: bool,
    format: &OutputFormat,
) -> Result<()> {
    let status = manager.set_two_factor(enabled).await?;

    match format {
        OutputFormat::Text => {
            let state = if status.enabled { "enabled" } else { "disabled" };
            match status.message.as_deref() {
                Some(message) => println!("Two-factor authentication {}: {}", state, message),
                None => println!("Two-factor authentication {}", state),
            }
        }
        OutputFormat::Json => output::print_json(&status),
    }
    Ok(())
}
