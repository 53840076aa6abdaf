//! `campusdesk doctor`: diagnose configuration, database and LLM setup.

use campusdesk_config::{AppConfig, DEV_TOKEN_SECRET};
use std::path::Path;

pub async fn run(path: &Path) -> anyhow::Result<()> {
    println!("CampusDesk Doctor");
    println!("=================\n");

    let mut issues = 0;

    let config = if path.exists() {
        match super::load_config(path) {
            Ok(config) => {
                println!("  [ok]   Config file valid ({})", path.display());
                config
            }
            Err(e) => {
                println!("  [fail] Config file invalid: {e:#}");
                println!("\n  1 issue found. Fix the config file and run doctor again.");
                return Ok(());
            }
        }
    } else {
        println!("  [warn] No config file at {}; using defaults (run `campusdesk config init`)", path.display());
        issues += 1;
        super::load_config(path)?
    };

    match super::open_stores(&config).await {
        Ok(stores) => match stores.campus.list_fee_catalogs().await {
            Ok(_) => println!("  [ok]   Database reachable ({})", stores.backend()),
            Err(e) => {
                println!("  [fail] Database query failed: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  [fail] {e:#}");
            issues += 1;
        }
    }

    match campusdesk_providers::router::build_from_config(&config.llm) {
        Some(provider) => println!(
            "  [ok]   LLM provider {} with model {}",
            provider.name(),
            config.llm.model
        ),
        None => {
            println!("  [warn] No LLM configured; chat answers come from the local fallback");
            println!("         Set CAMPUSDESK_API_KEY (or GEMINI_API_KEY / OPENAI_API_KEY)");
            issues += 1;
        }
    }

    if config.auth.secret() == DEV_TOKEN_SECRET {
        println!("  [warn] Using the development token secret; set CAMPUSDESK_TOKEN_SECRET");
        issues += 1;
    } else {
        println!("  [ok]   Token secret configured");
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }
    Ok(())
}
