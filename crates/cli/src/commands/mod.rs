pub mod chat;
pub mod config_cmd;
pub mod init_db;
pub mod serve;

use anyhow::Context;
use fieldrep_config::AppConfig;
use fieldrep_core::store::RecordStore;
use fieldrep_store::SqliteStore;
use std::path::Path;
use std::sync::Arc;

/// Load config from `path` if given, else from the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_path(path),
        None => AppConfig::load(),
    };
    config.context("Failed to load config")
}

/// Open the configured database. Migrations run on connect.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    let store = SqliteStore::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.url))?;
    Ok(Arc::new(store))
}
