pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use waypoint_core::config::{AppConfig, ConfigOverrides, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "waypoint",
    about = "Waypoint personal planning assistant CLI",
    long_about = "Chat with the Waypoint command layer, or operate its database migrations.",
    after_help = "Examples:\n  waypoint chat\n  waypoint migrate --database-url sqlite://waypoint.db"
)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Override the configured log level")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive chat session against an in-memory store")]
    Chat {
        #[arg(long, help = "Base URL of the remote assistant delegate")]
        delegate_url: Option<String>,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate {
        #[arg(long, help = "Override the configured database URL")]
        database_url: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        log_level: cli.log_level.clone(),
        database_url: match &cli.command {
            Command::Migrate { database_url } => database_url.clone(),
            Command::Chat { .. } => None,
        },
        delegate_base_url: match &cli.command {
            Command::Chat { delegate_url } => delegate_url.clone(),
            Command::Migrate { .. } => None,
        },
        ..ConfigOverrides::default()
    };

    let config = match AppConfig::load(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration issue: {error}");
            return ExitCode::from(2);
        }
    };
    init_tracing(&config);

    let result = match cli.command {
        Command::Chat { .. } => commands::chat::run(&config),
        Command::Migrate { .. } => commands::migrate::run(&config),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    // A second init (tests, repeated calls) is harmless.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
