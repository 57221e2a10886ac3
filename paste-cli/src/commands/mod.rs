//! CLI command implementations.

pub mod add;
pub mod list;
pub mod login;
pub mod logout;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use paste_client::{HttpRemote, PastebinRepository};
use paste_store::SqliteStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;

/// Repository over the on-disk cache and the HTTP API.
pub type Repository = PastebinRepository<SqliteStore, HttpRemote>;

/// Everything a command needs.
pub struct App {
    /// Loaded configuration.
    pub config: Config,
    /// Location of the cache database.
    pub database: PathBuf,
    /// Direct handle on the cache.
    pub store: Arc<SqliteStore>,
    /// Paste and session repositories.
    pub repo: Repository,
}

impl App {
    /// Open the cache and build the repositories.
    pub async fn open(config: Config, data_dir: &Path) -> Result<Self> {
        let database = config.database_path(data_dir);
        let store = Arc::new(
            SqliteStore::new(&database)
                .await
                .with_context(|| format!("Failed to open cache {}", database.display()))?,
        );
        let remote = Arc::new(
            HttpRemote::new(config.remote_config()).context("Invalid API configuration")?,
        );
        let repo = PastebinRepository::new(
            Arc::clone(&store),
            remote,
            config.repository_config(),
        );

        Ok(Self {
            config,
            database,
            store,
            repo,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// App over a temp directory with an API that refuses connections.
    pub async fn offline_app() -> (TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.api.base_url = "http://127.0.0.1:1/address/".to_string();
        config.sync.error_delay_ms = 0;
        let app = App::open(config, dir.path()).await.unwrap();
        (dir, app)
    }
}
