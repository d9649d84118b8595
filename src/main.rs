mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "caltrack")]
#[command(about = "Turn tagged calendar events into Redmine time entries")]
struct Cli {
    /// Settings file (defaults to ~/.config/caltrack/settings.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level or filter directive (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every user's calendar with their time entries
    Sync {
        /// Decide and report, but write nothing to Redmine
        #[arg(long)]
        dry_run: bool,

        /// Only sync this user (by login)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// List users with a calendar feed
    Users,
    /// Validate the settings file
    Check,
    /// Write a default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let settings_path = commands::settings_path(cli.settings)?;

    match cli.command {
        Commands::Sync { dry_run, user } => {
            let settings = commands::load_settings(&settings_path)?;
            let options = commands::sync::SyncOptions { dry_run, user };
            commands::sync::run(&settings, &options).await
        }
        Commands::Users => {
            let settings = commands::load_settings(&settings_path)?;
            commands::users::run(&settings).await
        }
        Commands::Check => commands::check::run(&settings_path),
        Commands::Init { force } => commands::init::run(&settings_path, force),
    }
}
