//! CampusDesk CLI, the main entry point.
//!
//! Commands:
//! - `serve`        Start the HTTP API server
//! - `migrate`      Create or update the database schema
//! - `seed`         Load the demo campus dataset
//! - `issue-token`  Sign a bearer token for a directory user
//! - `ask`          Send one chat message from the terminal
//! - `config`       Show, locate or initialize the configuration
//! - `doctor`       Diagnose configuration, database and LLM setup

use campusdesk_config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "campusdesk",
    about = "CampusDesk: university information assistant backend",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.campusdesk/config.toml)
    #[arg(short, long, global = true, env = "CAMPUSDESK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Load the demo dataset before serving
        #[arg(long)]
        seed: bool,
    },

    /// Create or update the database schema
    Migrate,

    /// Load the demo campus dataset
    Seed,

    /// Sign a bearer token for a directory user
    IssueToken {
        /// User id in the identity directory
        #[arg(short, long)]
        user: String,
    },

    /// Send one chat message and print the reply
    Ask {
        /// The message
        message: String,

        /// Ask as this directory user instead of a guest
        #[arg(long = "as")]
        as_user: Option<String>,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose configuration, database and LLM setup
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file if none exists
    Init,
}

fn init_tracing(verbose: bool, config: Option<&AppConfig>) {
    let default = if verbose {
        "debug".to_string()
    } else {
        config.map_or_else(|| "info".to_string(), |c| c.logging.level.clone())
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if config.is_some_and(|c| c.logging.json) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    // Config commands must work even when the file is broken.
    if let Commands::Config { action } = &cli.command {
        init_tracing(cli.verbose, None);
        return match action {
            ConfigAction::Show => commands::config::show(&config_path),
            ConfigAction::Path => commands::config::path(&config_path),
            ConfigAction::Init => commands::config::init(&config_path),
        };
    }
    if let Commands::Doctor = cli.command {
        init_tracing(cli.verbose, None);
        return commands::doctor::run(&config_path).await;
    }

    let config = commands::load_config(&config_path)?;
    init_tracing(cli.verbose, Some(&config));

    match cli.command {
        Commands::Serve { port, seed } => commands::serve::run(config, port, seed).await,
        Commands::Migrate => commands::migrate::run(&config).await,
        Commands::Seed => commands::seed::run(&config).await,
        Commands::IssueToken { user } => commands::token::run(&config, &user).await,
        Commands::Ask { message, as_user } => {
            commands::ask::run(config, &message, as_user.as_deref()).await
        }
        Commands::Config { .. } | Commands::Doctor => Ok(()),
    }
}
