pub mod ask;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;
pub mod serve;
pub mod token;

use anyhow::Context;
use campusdesk_config::AppConfig;
use campusdesk_store::Stores;
use std::path::Path;

/// Load `path` with environment overrides applied.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    AppConfig::load_with_env(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Open the configured database.
pub async fn open_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    campusdesk_store::open(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))
}
