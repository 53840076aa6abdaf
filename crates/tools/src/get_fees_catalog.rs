//! Fee-catalog lookup with the level/session fallback chain.

use async_trait::async_trait;
use campusdesk_core::catalog::{FeeCatalog, resolve_fee_catalog};
use campusdesk_core::error::ToolError;
use campusdesk_core::store::CampusStore;
use campusdesk_core::tool::{Tool, ToolContext, ToolResult};
use serde_json::json;
use std::sync::Arc;

pub const NAME: &str = "getFeesCatalog";

/// Which step of the fallback chain produced the catalog.
pub fn match_kind(catalog: &FeeCatalog, level: Option<&str>, session: Option<&str>) -> &'static str {
    let level_hit = level.is_some_and(|l| l.trim() == catalog.level);
    let session_hit = session.is_some_and(|s| s.trim() == catalog.session);
    match (level_hit, session_hit) {
        (true, true) => "exact",
        (true, false) => "level",
        (false, true) => "session",
        (false, false) => "latest",
    }
}

/// Levels may arrive as numbers ("100" or 100) from the LLM.
fn text_arg(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub struct GetFeesCatalogTool {
    store: Arc<dyn CampusStore>,
}

impl GetFeesCatalogTool {
    pub fn new(store: Arc<dyn CampusStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetFeesCatalogTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Look up the school fees schedule for a student level and academic session."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "level": {
                    "type": "string",
                    "description": "Student level, e.g. 100, 200"
                },
                "session": {
                    "type": "string",
                    "description": "Academic session, e.g. 2025/2026"
                }
            }
        })
    }

    async fn execute(
        &self,
        _ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let level = text_arg(&arguments["level"]);
        let session = text_arg(&arguments["session"]);

        let catalogs = self.store.list_fee_catalogs().await?;
        let Some(catalog) = resolve_fee_catalog(&catalogs, level.as_deref(), session.as_deref())
        else {
            return Ok(ToolResult::error("No fee catalog is available"));
        };

        Ok(ToolResult::ok(
            "fees",
            json!({
                "match": match_kind(catalog, level.as_deref(), session.as_deref()),
                "total": catalog.total(),
                "catalog": catalog,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusdesk_core::actor::Actor;
    use campusdesk_store::{InMemoryStore, seed_demo};

    async fn tool() -> GetFeesCatalogTool {
        let store = Arc::new(InMemoryStore::new());
        seed_demo(store.as_ref()).await.unwrap();
        GetFeesCatalogTool::new(store)
    }

    fn ctx() -> ToolContext {
        ToolContext::new(Actor::guest())
    }

    #[tokio::test]
    async fn exact_match() {
        let result = tool()
            .await
            .execute(&ctx(), json!({"level": 200, "session": "2025/2026"}))
            .await
            .unwrap();
        assert_eq!(result.kind(), "fees");
        assert_eq!(result.data["match"], "exact");
        assert_eq!(result.data["catalog"]["id"], "fees-200-2025");
    }

    #[tokio::test]
    async fn level_only_fallback() {
        let result = tool()
            .await
            .execute(&ctx(), json!({"level": "100", "session": "2030/2031"}))
            .await
            .unwrap();
        assert_eq!(result.data["match"], "level");
        assert_eq!(result.data["catalog"]["id"], "fees-100-2025");
    }

    #[tokio::test]
    async fn repeated_lookup_is_identical() {
        let tool = tool().await;
        let args = json!({"level": "300", "session": "2024/2025"});
        let first = tool.execute(&ctx(), args.clone()).await.unwrap();
        let second = tool.execute(&ctx(), args).await.unwrap();
        assert_eq!(first.data, second.data);
        assert_eq!(first.data["match"], "session");
    }

    #[tokio::test]
    async fn empty_catalog_is_error_shaped() {
        let tool = GetFeesCatalogTool::new(Arc::new(InMemoryStore::new()));
        let result = tool.execute(&ctx(), json!({"level": "100"})).await.unwrap();
        assert_eq!(result.kind(), "error");
    }
}
