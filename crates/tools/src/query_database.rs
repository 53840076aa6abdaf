//! Campus entity search: departments, courses, buildings and heads of
//! department.

use async_trait::async_trait;
use campusdesk_core::catalog::CourseQuery;
use campusdesk_core::error::ToolError;
use campusdesk_core::store::{COURSE_SEARCH_LIMIT, CampusStore, SEARCH_LIMIT};
use campusdesk_core::tool::{Tool, ToolContext, ToolResult};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "queryDatabase";

/// What a `queryDatabase` call searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Department,
    Course,
    Building,
    Hod,
}

impl QueryType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "department" => Some(Self::Department),
            "course" => Some(Self::Course),
            "building" => Some(Self::Building),
            "hod" => Some(Self::Hod),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Course => "course",
            Self::Building => "building",
            Self::Hod => "hod",
        }
    }
}

pub struct QueryDatabaseTool {
    store: Arc<dyn CampusStore>,
}

impl QueryDatabaseTool {
    pub fn new(store: Arc<dyn CampusStore>) -> Self {
        Self { store }
    }

    /// Run a search directly, outside the LLM loop.
    pub async fn search(&self, query_type: QueryType, term: &str) -> Result<ToolResult, ToolError> {
        let term = term.trim();
        let results = match query_type {
            QueryType::Department => {
                json!(self.store.search_departments(term, SEARCH_LIMIT).await?)
            }
            QueryType::Hod => json!(self.store.search_departments_by_hod(term, SEARCH_LIMIT).await?),
            QueryType::Building => json!(self.store.search_buildings(term, SEARCH_LIMIT).await?),
            QueryType::Course => {
                let query = CourseQuery {
                    search: Some(term.to_string()),
                    ..Default::default()
                };
                json!(self.store.list_courses(&query, COURSE_SEARCH_LIMIT).await?)
            }
        };

        let count = results.as_array().map_or(0, Vec::len);
        debug!(query_type = query_type.as_str(), term, count, "queryDatabase");

        Ok(ToolResult::ok(
            query_type.as_str(),
            json!({ "searchTerm": term, "count": count, "results": results }),
        ))
    }
}

#[async_trait]
impl Tool for QueryDatabaseTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Search the campus database for departments, courses, buildings, or a head of department (HOD) by name."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "queryType": {
                    "type": "string",
                    "enum": ["department", "course", "building", "hod"],
                    "description": "Which catalog to search"
                },
                "searchTerm": {
                    "type": "string",
                    "description": "Name, code or keyword to look for"
                }
            },
            "required": ["queryType", "searchTerm"]
        })
    }

    async fn execute(
        &self,
        _ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let raw_type = arguments["queryType"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'queryType' argument".into()))?;
        let Some(query_type) = QueryType::parse(raw_type) else {
            return Ok(ToolResult::error(format!("Invalid query type: {raw_type}")));
        };
        let term = arguments["searchTerm"]
            .as_str()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'searchTerm' argument".into()))?;

        self.search(query_type, term).await
    }
}
