//! Sign-in and session commands.

use super::prompt_line;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use serde_json::json;
use session_manager::{SessionManager, User};

/// Which credential exchange to run after prompting.
#[derive(Clone, Copy)]
enum SignIn {
    Login,
    Register,
}

/// Prompt for email and password, then sign in.
pub async fn login(manager: &SessionManager, format: &OutputFormat) -> Result<()> {
    if let Some(user) = manager.user() {
        output::print_success(&format!("Already logged in as {}", user.email), format);
        return Ok(());
    }
    sign_in(manager, SignIn::Login, format).await
}

/// Prompt for email and password, then create an account.
pub async fn register(manager: &SessionManager, format: &OutputFormat) -> Result<()> {
    sign_in(manager, SignIn::Register, format).await
}

async fn sign_in(manager: &SessionManager, kind: SignIn, format: &OutputFormat) -> Result<()> {
    let email = prompt_line("Email")?;
    if email.is_empty() {
        anyhow::bail!("Email is required");
    }

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }

    let result = match kind {
        SignIn::Login => manager.login(&email, &password).await,
        SignIn::Register => manager.register(&email, &password).await,
    };
    let user = result?;

    match format {
        OutputFormat::Text => match kind {
            SignIn::Login => println!("Logged in as {}", user.email),
            SignIn::Register => {
                println!("Account created for {}", user.email);
                if !user.email_verified {
                    println!("Check your inbox to verify your email address.");
                }
            }
        },
        OutputFormat::Json => output::print_json(&json!({ "status": "success", "user": user })),
    }
    Ok(())
}

/// Revoke the session on the server (best effort) and forget it locally.
pub async fn logout(manager: &SessionManager, format: &OutputFormat) -> Result<()> {
    let was_signed_in = manager.is_authenticated();
    manager.logout().await;

    if was_signed_in {
        output::print_success("Logged out successfully", format);
    } else {
        output::print_success("Not logged in", format);
    }
    Ok(())
}

/// Show the hydrated session status.
pub async fn status(manager: &SessionManager, format: &OutputFormat) -> Result<()> {
    let snapshot = manager.snapshot();

    match format {
        OutputFormat::Text => match &snapshot.user {
            Some(user) if snapshot.authenticated => print_user(user),
            _ => println!("Auth:     not logged in"),
        },
        OutputFormat::Json => output::print_json(&snapshot),
    }
    Ok(())
}

fn print_user(user: &User) {
    println!("Auth:     logged in");
    output::print_row("User ID", &user.id);
    output::print_row("Email", &user.email);
    output::print_row(
        "Verified",
        if user.email_verified { "yes" } else { "no" },
    );
    output::print_row("Created", &user.created_at.to_rfc3339());
}

/// Exchange the refresh token for a new access token.
pub async fn refresh(manager: &SessionManager, format: &OutputFormat) -> Result<()> {
    manager.refresh_access_token().await?;
    output::print_success("Access token refreshed", format);
    Ok(())
}
