//! `campusdesk serve`: start the HTTP API server.

use campusdesk_config::AppConfig;
use campusdesk_store::seed_demo;

pub async fn run(mut config: AppConfig, port: Option<u16>, seed: bool) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let stores = super::open_stores(&config).await?;
    if seed {
        let report = seed_demo(stores.campus.as_ref()).await?;
        tracing::info!(?report, "Demo data loaded");
    }

    println!("CampusDesk API");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Database:  {} ({})", config.database.url, stores.backend());
    println!(
        "   LLM:       {}",
        if config.llm.is_enabled() { config.llm.provider.as_str() } else { "local fallback only" }
    );

    campusdesk_gateway::start(config, stores)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway stopped: {e}"))
}
