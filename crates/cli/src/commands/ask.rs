//! `campusdesk ask`: send one chat message from the terminal.

use anyhow::bail;
use campusdesk_agent::ChatTurn;
use campusdesk_config::AppConfig;
use campusdesk_core::Actor;
use campusdesk_gateway::GatewayState;

pub async fn run(config: AppConfig, message: &str, as_user: Option<&str>) -> anyhow::Result<()> {
    let stores = super::open_stores(&config).await?;

    let actor = match as_user {
        None => Actor::guest(),
        Some(id) => match stores.campus.get_user(id).await? {
            Some(user) => user.to_actor(),
            None => bail!("No user with id {id:?}"),
        },
    };

    let provider = campusdesk_providers::router::build_from_config(&config.llm);
    let state = GatewayState::new(config, stores, provider);
    let reply = state.orchestrator.converse(&actor, ChatTurn::new(message)).await?;

    println!("{}", reply.reply);
    if !reply.invocations.is_empty() {
        eprintln!();
        for invocation in &reply.invocations {
            eprintln!("  [tool] {} {}", invocation.name, invocation.args);
        }
    }
    if reply.used_fallback {
        eprintln!("  (answered by the local fallback)");
    }
    if let Some(id) = reply.conversation_id {
        eprintln!("  conversation: {id}");
    }
    Ok(())
}
