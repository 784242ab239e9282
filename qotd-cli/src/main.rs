//! qotd CLI - quote of the day backend
//!
//! Runs the quote server with its midnight seeding job, and exposes the
//! seeding, cleanup and lookup operations as one-shot commands.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use qotd_core::Config;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// qotd - quote of the day backend
#[derive(Parser)]
#[command(name = "qotd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gemini model to use (overrides config)
    #[arg(short, long, global = true, env = "QOTD_MODEL")]
    model: Option<String>,

    /// Server port (overrides config)
    #[arg(long, global = true, env = "QOTD_PORT")]
    port: Option<u16>,

    /// SQLite database file (overrides config)
    #[arg(long, global = true, env = "QOTD_DB_PATH")]
    db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "QOTD_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server and the midnight seeding job
    Serve {
        /// Do not schedule the daily seeding job
        #[arg(long)]
        no_seed: bool,

        /// Run the seeding job once before serving
        #[arg(long)]
        seed_on_start: bool,
    },

    /// Fill today's daily quotes for every category
    Seed {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove duplicate quotes and recover missing authors
    Cleanup {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print today's quote of the day
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List categories
    Categories,

    /// Check server status
    Status,

    /// Quota commands
    #[command(subcommand)]
    Quota(QuotaCommands),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum QuotaCommands {
    /// Show the running server's quota usage
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Initialize default configuration
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if let Some(path) = &cli.config {
        Config::load_from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(model) = &cli.model {
        config.gemini.model = model.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(db) = &cli.db {
        config.database.path = Some(db.clone());
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    init_logging(&config.logging.level);

    Config::ensure_dirs()?;

    match cli.command {
        Commands::Serve {
            no_seed,
            seed_on_start,
        } => commands::serve::run(config, no_seed, seed_on_start).await,
        Commands::Seed { json } => commands::seed::run(config, json).await,
        Commands::Cleanup { json } => commands::cleanup::run(config, json).await,
        Commands::Today { json } => commands::today::run(config, json).await,
        Commands::Categories => commands::categories::run(config).await,
        Commands::Status => commands::status::run(config).await,
        Commands::Quota(cmd) => match cmd {
            QuotaCommands::Status { json } => commands::quota::status(config, json).await,
        },
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(config),
            ConfigCommands::Init { force } => commands::config::init(force),
        },
    }
}
