//! Role-filtered news lookup.
//!
//! The visibility scope is always built from the authenticated actor. The
//! identity arguments in the schema exist for the LLM's benefit only and are
//! never trusted.

use async_trait::async_trait;
use campusdesk_core::error::ToolError;
use campusdesk_core::store::{CampusStore, NEWS_LIMIT};
use campusdesk_core::tool::{Tool, ToolContext, ToolResult};
use campusdesk_policy::visibility_scope;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "getNews";

pub struct GetNewsTool {
    store: Arc<dyn CampusStore>,
}

impl GetNewsTool {
    pub fn new(store: Arc<dyn CampusStore>) -> Self {
        Self { store }
    }
}

fn string_list(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        serde_json::Value::String(s) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl Tool for GetNewsTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get the latest campus news and announcements visible to the current user."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "userId": { "type": "string", "description": "Current user id" },
                "userRole": { "type": "string", "description": "Current user role" },
                "departmentId": { "type": "string", "description": "Current user's department" },
                "courseIds": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Current user's courses"
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Only news carrying one of these tags"
                }
            }
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        if let Some(claimed) = arguments["userId"].as_str() {
            if claimed != ctx.actor.id {
                debug!(claimed, actor_id = %ctx.actor.id, "Ignoring LLM-supplied identity");
            }
        }

        let scope = visibility_scope(&ctx.actor).with_tags(string_list(&arguments["tags"]));
        let news = self.store.list_news(&scope, NEWS_LIMIT).await?;

        let items: Vec<serde_json::Value> = news
            .iter()
            .map(|n| {
                json!({
                    "id": n.id,
                    "title": n.title,
                    "content": n.content,
                    "audience": n.audience,
                    "tags": n.tags,
                    "createdAt": n.created_at,
                })
            })
            .collect();

        Ok(ToolResult::ok(
            "news",
            json!({ "count": items.len(), "news": items }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusdesk_core::actor::{Actor, Role};
    use campusdesk_store::{InMemoryStore, seed_demo};

    async fn tool() -> GetNewsTool {
        let store = Arc::new(InMemoryStore::new());
        seed_demo(store.as_ref()).await.unwrap();
        GetNewsTool::new(store)
    }

    fn ids(result: &ToolResult) -> Vec<String> {
        result.data["news"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn guest_sees_only_everyone_news() {
        let result = tool()
            .await
            .execute(&ToolContext::new(Actor::guest()), json!({}))
            .await
            .unwrap();
        assert_eq!(ids(&result), vec!["news-sports", "news-welcome"]);
    }

    #[tokio::test]
    async fn claimed_identity_cannot_widen_scope() {
        let result = tool()
            .await
            .execute(
                &ToolContext::new(Actor::guest()),
                json!({"userId": "admin", "userRole": "system_admin", "departmentId": "cs"}),
            )
            .await
            .unwrap();
        assert_eq!(result.data["count"], 2);
    }

    #[tokio::test]
    async fn student_sees_department_and_course_news() {
        let student = Actor::new("stu-ada", Role::Student)
            .with_department("cs")
            .with_courses(["csc101", "mth101"]);
        let result = tool()
            .await
            .execute(&ToolContext::new(student), json!({}))
            .await
            .unwrap();
        let ids = ids(&result);
        assert!(ids.contains(&"news-cs-seminar".to_string()));
        assert!(ids.contains(&"news-csc101-test".to_string()));
        assert!(ids.contains(&"news-exams".to_string()));
        assert!(!ids.contains(&"news-staff-meeting".to_string()));
        // newest first
        assert_eq!(ids[0], "news-sports");
    }

    #[tokio::test]
    async fn tag_filter_narrows_results() {
        let result = tool()
            .await
            .execute(&ToolContext::new(Actor::guest()), json!({"tags": ["exams"]}))
            .await
            .unwrap();
        // untagged items still pass
        assert_eq!(ids(&result), vec!["news-welcome"]);
    }
}
