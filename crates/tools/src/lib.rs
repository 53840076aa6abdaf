//! Campus tool functions for the CampusDesk assistant.
//!
//! The LLM may call any of these mid-conversation. Every tool wraps a
//! catalog query and answers with a tagged result `{type, ...}`; failures
//! come back error-shaped through [`ToolRegistry::dispatch`].

pub mod get_fees_catalog;
pub mod get_news;
pub mod query_database;
pub mod recommend_resources;

use campusdesk_core::store::CampusStore;
use campusdesk_core::tool::ToolRegistry;
use std::sync::Arc;

pub use get_fees_catalog::GetFeesCatalogTool;
pub use get_news::GetNewsTool;
pub use query_database::{QueryDatabaseTool, QueryType};
pub use recommend_resources::RecommendResourcesTool;

/// Create the registry with all four campus tools bound to `store`.
pub fn campus_registry(store: Arc<dyn CampusStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(QueryDatabaseTool::new(store.clone())));
    registry.register(Box::new(RecommendResourcesTool::new(store.clone())));
    registry.register(Box::new(GetNewsTool::new(store.clone())));
    registry.register(Box::new(GetFeesCatalogTool::new(store)));
    registry
}
