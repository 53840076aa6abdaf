//! `campusdesk config`: configuration helpers.

use anyhow::Context;
use campusdesk_config::AppConfig;
use std::path::Path;

pub fn show(path: &Path) -> anyhow::Result<()> {
    let mut config = super::load_config(path)?;
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some("[REDACTED]".into());
    }
    if config.auth.token_secret.is_some() {
        config.auth.token_secret = Some("[REDACTED]".into());
    }
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn path(path: &Path) -> anyhow::Result<()> {
    println!("{}", path.display());
    Ok(())
}

pub fn init(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_config() {
        let dir = std::env::temp_dir().join(format!("campusdesk-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        init(&path).unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.llm.max_tool_rounds, 5);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
