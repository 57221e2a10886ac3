//! # pastebin
//!
//! Command-line client for an offline-first pastebin.
//!
//! ## Commands
//!
//! - `login`: Store the account address and API key
//! - `logout`: Remove the stored session
//! - `status`: Show session and cache status
//! - `list`: Refresh from the API and list cached pastes
//! - `add`: Create or update a paste
//! - `sync`: Push pastes that were saved while offline
//!
//! ## Example
//!
//! ```bash
//! # Log in (prompts for the API key)
//! pastebin login --name alice
//!
//! # Add a paste
//! pastebin add hello "Hello, world!"
//!
//! # List pastes, following changes
//! pastebin list --watch
//!
//! # Push anything saved while offline
//! pastebin sync
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{add, list, login, logout, status, sync, App};
use config::Config;

/// Command-line client for an offline-first pastebin.
#[derive(Parser, Debug)]
#[command(name = "pastebin")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the cache database and config file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: pastebin.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base URL from the config file
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store the account address and API key
    Login {
        /// Account address
        #[arg(long, short)]
        name: String,

        /// API key (will prompt if not provided)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Remove the stored session
    Logout,

    /// Show session and cache status
    Status,

    /// Refresh from the API and list cached pastes
    List {
        /// Keep running and print every change
        #[arg(long, short)]
        watch: bool,
    },

    /// Create or update a paste
    Add {
        /// Paste title (no whitespace)
        title: String,

        /// Paste content (or use --file)
        content: Option<String>,

        /// Read the content from a file
        #[arg(long, short, conflicts_with = "content")]
        file: Option<PathBuf>,
    },

    /// Push pastes that were saved while offline
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pastebin=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    let mut config = Config::load(cli.config.as_deref(), &data_dir)?;
    if let Some(api_url) = cli.api_url {
        config.api.base_url = api_url;
    }

    tracing::debug!(
        "Using data directory {} and API {}",
        data_dir.display(),
        config.api.base_url
    );
    let app = App::open(config, &data_dir).await?;

    match cli.command {
        Commands::Login { name, api_key } => {
            login::run(&app, &name, api_key.as_deref()).await?;
        }
        Commands::Logout => {
            logout::run(&app).await?;
        }
        Commands::Status => {
            status::run(&app).await?;
        }
        Commands::List { watch } => {
            list::run(&app, watch).await?;
        }
        Commands::Add {
            title,
            content,
            file,
        } => {
            let content = if let Some(content) = content {
                content
            } else if let Some(path) = file {
                tokio::fs::read_to_string(&path)
                    .await
                    .context("Failed to read file")?
            } else {
                anyhow::bail!("Must specify content or --file");
            };
            add::run(&app, &title, &content).await?;
        }
        Commands::Sync => {
            sync::run(&app).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for pastebin.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("lol", "omg", "pastebin")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
