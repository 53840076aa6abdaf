//! `campusdesk issue-token`: sign a bearer token for a directory user.

use anyhow::bail;
use campusdesk_config::AppConfig;
use campusdesk_security::TokenSigner;

pub async fn run(config: &AppConfig, user_id: &str) -> anyhow::Result<()> {
    let stores = super::open_stores(config).await?;
    let Some(user) = stores.campus.get_user(user_id).await? else {
        bail!("No user with id {user_id:?}; run `campusdesk seed` for the demo users");
    };
    if !user.active {
        bail!("User {user_id:?} is deactivated");
    }

    let signer = TokenSigner::from_config(&config.auth);
    let token = signer.issue(&user);
    tracing::debug!(user_id, role = %user.role, "Token issued");

    eprintln!("{} ({}), valid for {}h", user.name, user.role, config.auth.token_ttl_hours);
    println!("{token}");
    Ok(())
}
