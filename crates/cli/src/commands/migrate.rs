//! `campusdesk migrate`: create or update the database schema.

use campusdesk_config::AppConfig;

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    // Opening a SQLite store runs its migrations.
    let stores = super::open_stores(config).await?;
    match stores.backend() {
        "in_memory" => println!("In-memory database selected; nothing to migrate."),
        backend => println!("Schema is up to date ({backend}: {}).", config.database.url),
    }
    Ok(())
}
