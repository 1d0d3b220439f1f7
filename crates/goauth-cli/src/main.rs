//! GoAuth CLI - command-line client for the GoAuth identity service.

mod commands;
mod output;

use auth_config::Paths;
use clap::{Parser, Subcommand, ValueEnum};
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(name = "goauth")]
#[command(about = "GoAuth - sign in and manage your account from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Identity service base URL
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login,
    /// Create an account with email and password
    Register,
    /// Log out and clear the stored session
    Logout,
    /// Show the current session
    Status,
    /// Exchange the refresh token for a new access token
    Refresh,
    /// Send a password reset email
    ForgotPassword {
        /// Account email address
        email: String,
    },
    /// Set a new password using the token from the reset email
    ResetPassword {
        /// Reset token
        token: String,
    },
    /// Confirm an email address using the token from the verification email
    VerifyEmail {
        /// Verification token
        token: String,
    },
    /// List recent account activity
    Activity,
    /// Turn two-factor authentication on or off
    TwoFactor {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Check the identity service
    Health {
        #[command(subcommand)]
        command: HealthCommands,
    },
}

#[derive(Subcommand)]
enum HealthCommands {
    /// Ping the service once
    Ping,
    /// Ping the service periodically until interrupted
    KeepAlive {
        /// Seconds between pings (defaults to the configured interval)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = commands::load_config(&paths, cli.api_url.as_deref())?;
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let format = &cli.format;

    if let Commands::Health { command } = &cli.command {
        let service = match command {
            HealthCommands::Ping => "goauth",
            HealthCommands::KeepAlive { .. } => "goauth-keepalive",
        };
        auth_config::init_logging_for_service(service, level, &paths, false);
        let client = commands::identity_client(&config)?;

        return match command {
            HealthCommands::Ping => commands::ping(&client, format).await,
            HealthCommands::KeepAlive { interval } => {
                let every = interval
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| config.keepalive_interval());
                commands::keep_alive(&client, every).await
            }
        };
    }

    auth_config::init_logging(level, &paths, false);
    debug!(api_url = %config.api_url, "Starting goauth");
    let manager = commands::session_manager(&paths, &config).await?;

    match cli.command {
        Commands::Login => commands::login(&manager, format).await,
        Commands::Register => commands::register(&manager, format).await,
        Commands::Logout => commands::logout(&manager, format).await,
        Commands::Status => commands::status(&manager, format).await,
        Commands::Refresh => commands::refresh(&manager, format).await,
        Commands::ForgotPassword { email } => {
            commands::forgot_password(&manager, &email, format).await
        }
        Commands::ResetPassword { token } => {
            commands::reset_password(&manager, &token, format).await
        }
        Commands::VerifyEmail { token } => commands::verify_email(&manager, &token, format).await,
        Commands::Activity => commands::activity(&manager, format).await,
        Commands::TwoFactor { state } => {
            commands::two_factor(&manager, state.enabled(), format).await
        }
        Commands::Health { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        output::print_error(&e.to_string(), &format);
        std::process::exit(1);
    }
}
