//! Learning-resource recommendations.
//!
//! No external search: the bundle is built from fixed providers and the
//! course name, enriched with the catalog title when the course is known.

use async_trait::async_trait;
use campusdesk_core::catalog::CourseQuery;
use campusdesk_core::error::ToolError;
use campusdesk_core::store::CampusStore;
use campusdesk_core::tool::{Tool, ToolContext, ToolResult};
use reqwest::Url;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub const NAME: &str = "recommendResources";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Video,
    Article,
    Both,
}

impl ResourceType {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "videos" => Some(Self::Video),
            "article" | "articles" => Some(Self::Article),
            "both" | "" => Some(Self::Both),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Article => "article",
            Self::Both => "both",
        }
    }

    fn wants(&self, kind: &str) -> bool {
        matches!(self, Self::Both) || self.as_str() == kind
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub title: String,
    pub kind: &'static str,
    pub provider: &'static str,
    pub url: String,
}

/// (kind, provider, title template, search page, query parameter)
const SOURCES: [(&str, &str, &str, &str, &str); 5] = [
    ("video", "YouTube", "{} lecture series", "https://www.youtube.com/results", "search_query"),
    ("video", "Khan Academy", "{} explained", "https://www.khanacademy.org/search", "page_search_query"),
    ("article", "Wikipedia", "{}: overview", "https://en.wikipedia.org/w/index.php", "search"),
    ("article", "MIT OpenCourseWare", "{} course notes", "https://ocw.mit.edu/search/", "q"),
    ("article", "Google Scholar", "Research on {}", "https://scholar.google.com/scholar", "q"),
];

/// Search URL for `topic`, form-encoded ("C++" becomes `C%2B%2B`).
fn search_url(page: &str, param: &str, topic: &str) -> Option<String> {
    let topic = topic.split_whitespace().collect::<Vec<_>>().join(" ");
    match Url::parse_with_params(page, &[(param, topic.as_str())]) {
        Ok(url) => Some(url.into()),
        Err(e) => {
            warn!(page, error = %e, "Skipping resource with invalid search URL");
            None
        }
    }
}

pub fn recommendations(topic: &str, resource_type: ResourceType) -> Vec<Resource> {
    SOURCES
        .iter()
        .filter(|(kind, ..)| resource_type.wants(kind))
        .filter_map(|(kind, provider, title, page, param)| {
            Some(Resource {
                title: title.replace("{}", topic),
                kind: *kind,
                provider: *provider,
                url: search_url(page, param, topic)?,
            })
        })
        .collect()
}

pub struct RecommendResourcesTool {
    store: Arc<dyn CampusStore>,
}

impl RecommendResourcesTool {
    pub fn new(store: Arc<dyn CampusStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RecommendResourcesTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Recommend videos and articles for studying a course or topic."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "courseName": {
                    "type": "string",
                    "description": "Course code, title or topic"
                },
                "resourceType": {
                    "type": "string",
                    "enum": ["video", "article", "both"],
                    "description": "Kind of resource wanted (default both)"
                }
            },
            "required": ["courseName"]
        })
    }

    async fn execute(
        &self,
        _ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let course_name = arguments["courseName"]
            .as_str()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'courseName' argument".into()))?;
        let raw_type = arguments["resourceType"].as_str().unwrap_or("both");
        let Some(resource_type) = ResourceType::parse(raw_type) else {
            return Ok(ToolResult::error(format!("Invalid resource type: {raw_type}")));
        };

        let query = CourseQuery {
            search: Some(course_name.to_string()),
            ..Default::default()
        };
        let course = self.store.list_courses(&query, 1).await?.into_iter().next();
        let topic = course
            .as_ref()
            .map(|c| c.title.clone())
            .unwrap_or_else(|| course_name.to_string());

        Ok(ToolResult::ok(
            "resources",
            json!({
                "course": topic,
                "courseId": course.map(|c| c.id),
                "resourceType": resource_type.as_str(),
                "resources": recommendations(&topic, resource_type),
            }),
        ))
    }
}
