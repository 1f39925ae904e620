//! Bookline CLI - Command-line interface for the booking client.
//!
//! Drives the full booking lifecycle from the terminal: list and act on
//! bookings, resolve payment orders, start sessions with an OTP, confirm
//! attendance, and watch the realtime channel. Useful for headless
//! operation, scripting, and debugging against a live server.

mod commands;
mod credentials;

use clap::{Parser, Subcommand};
use tracing::info;

use bl_core::config::{AppConfig, ConfigHandle};
use bl_core::error::BlResult;
use bl_core::logging;
use bl_core::platform::Platform;

/// Bookline - booking marketplace client.
#[derive(Parser)]
#[command(
    name = "bookline",
    version,
    about = "Bookline booking client CLI",
    long_about = "A command-line interface for the Bookline booking client.\n\
                   Connect to a Bookline server to manage bookings, payments, and sessions."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current configuration and server reachability.
    Status,
    /// List and act on bookings.
    Bookings {
        #[command(subcommand)]
        action: commands::bookings::BookingsAction,
    },
    /// Payment order commands.
    Pay {
        #[command(subcommand)]
        action: commands::payment::PayAction,
    },
    /// Start a confirmed booking with the session OTP.
    Start {
        /// Booking id.
        id: String,
        /// OTP code (prompted for if omitted).
        #[arg(short, long)]
        otp: Option<String>,
    },
    /// Submit an attendance mark for an in-progress booking.
    Attend {
        /// Booking id.
        id: String,
        /// Which side of the booking you are on.
        #[arg(long = "as", value_enum)]
        actor: commands::attend::ActorArg,
        /// Mark the session as not having taken place.
        #[arg(long)]
        absent: bool,
        /// Optional note attached to the mark.
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Connect the realtime channel and print events as they arrive.
    Watch,
    /// Invalidate the stored session token.
    Logout,
}

#[tokio::main]
async fn main() -> BlResult<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let log_dir = Platform::log_dir().unwrap_or_else(|_| std::path::PathBuf::from("logs"));
    let _guard = logging::init_logging(log_level, &log_dir, false)?;

    // Load configuration
    let config = if let Some(path) = cli.config.as_deref() {
        AppConfig::load_from_file(std::path::Path::new(path))?
    } else {
        AppConfig::load_default()?
    };
    let config: ConfigHandle = config.into_handle();

    info!("Bookline CLI v{}", bl_core::constants::APP_VERSION);

    match cli.command {
        Commands::Status => commands::status::run(config, cli.format).await,
        Commands::Bookings { action } => commands::bookings::run(config, action, cli.format).await,
        Commands::Pay { action } => commands::payment::run(config, action, cli.format).await,
        Commands::Start { id, otp } => commands::start::run(config, id, otp, cli.format).await,
        Commands::Attend { id, actor, absent, note } => {
            commands::attend::run(config, id, actor, absent, note, cli.format).await
        }
        Commands::Watch => commands::watch::run(config).await,
        Commands::Logout => {
            use bl_core::credentials::CredentialProvider;
            credentials::StoredCredentials::load()?.clear_session().await?;
            println!("Session cleared.");
            Ok(())
        }
    }
}
