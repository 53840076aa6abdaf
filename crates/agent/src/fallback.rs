//! Local keyword responder used when the LLM is unavailable.
//!
//! Never fails and never returns empty text. Location questions still run
//! the building search so callers get real directions offline.

use crate::orchestrator::dispatch_with_timeout;
use campusdesk_core::actor::Actor;
use campusdesk_core::message::ToolInvocation;
use campusdesk_core::tool::{ToolCall, ToolContext, ToolRegistry};
use campusdesk_tools::query_database;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const LOCATION_WORDS: [&str; 6] = ["library", "building", "hall", "where", "located", "office"];
const COURSE_WORDS: [&str; 4] = ["course", "courses", "class", "lecture"];
const GREETING_WORDS: [&str; 5] = ["hello", "hi", "hey", "morning", "afternoon"];

/// Words dropped when extracting a building search term.
const STOPWORDS: [&str; 22] = [
    "where", "is", "are", "the", "a", "an", "located", "location", "find", "how", "do", "i",
    "can", "to", "get", "of", "please", "what", "which", "building", "me", "show",
];

pub const MENU: &str = "I can help you with:\n\
• Finding buildings and offices on campus\n\
• Department and course information\n\
• The latest campus news\n\
• School fees for your level and session\n\
• Study resources for your courses";

const GREETING: &str = "Hello! I'm CampusDesk, the university information assistant. \
Ask me where a building is, about a department or course, the latest news, or school fees.";

const COURSES: &str = "You can browse courses by department and level in the Courses section, \
or ask me about a specific course code such as CSC 101.";

/// The fallback reply and any tools it ran.
#[derive(Debug, Clone)]
pub struct FallbackReply {
    pub text: String,
    pub invocations: Vec<ToolInvocation>,
}

pub struct FallbackResponder {
    tools: Arc<ToolRegistry>,
    tool_timeout: Duration,
}

fn words(message: &str) -> Vec<String> {
    message
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn mentions(words: &[String], keywords: &[&str]) -> bool {
    words.iter().any(|w| keywords.contains(&w.as_str()))
}

fn directions(result: &Value) -> Option<String> {
    let buildings = result.get("results")?.as_array()?;
    if buildings.is_empty() {
        return None;
    }
    let lines: Vec<String> = buildings
        .iter()
        .take(3)
        .filter_map(|b| {
            let name = b.get("name")?.as_str()?;
            let location = b
                .get("location")
                .and_then(Value::as_str)
                .or_else(|| b.get("description").and_then(Value::as_str))
                .unwrap_or("on campus");
            Some(format!("• {name}: {location}"))
        })
        .collect();
    Some(format!("Here's what I found:\n{}", lines.join("\n")))
}

impl FallbackResponder {
    pub fn new(tools: Arc<ToolRegistry>, tool_timeout: Duration) -> Self {
        Self {
            tools,
            tool_timeout,
        }
    }

    pub async fn respond(&self, actor: &Actor, message: &str) -> FallbackReply {
        let words = words(message);

        if mentions(&words, &LOCATION_WORDS) {
            return self.locate(actor, &words).await;
        }

        let text = if mentions(&words, &COURSE_WORDS) {
            COURSES
        } else if mentions(&words, &GREETING_WORDS) {
            GREETING
        } else {
            MENU
        };
        FallbackReply {
            text: text.into(),
            invocations: Vec::new(),
        }
    }

    /// Search buildings for the whole phrase, then word by word.
    async fn locate(&self, actor: &Actor, words: &[String]) -> FallbackReply {
        let terms: Vec<&str> = words
            .iter()
            .map(String::as_str)
            .filter(|w| !STOPWORDS.contains(w))
            .collect();
        if terms.is_empty() {
            return FallbackReply {
                text: "Which building or office are you looking for? Tell me its name and I'll point you there."
                    .into(),
                invocations: Vec::new(),
            };
        }

        let ctx = ToolContext::new(actor.clone());
        let phrase = terms.join(" ");
        let mut attempt = self.search(&ctx, &phrase).await;
        if attempt.0.is_none() && terms.len() > 1 {
            for term in &terms {
                let next = self.search(&ctx, term).await;
                if next.0.is_some() {
                    attempt = next;
                    break;
                }
            }
        }

        let (found, invocation) = attempt;
        let text = found.unwrap_or_else(|| {
            format!("I couldn't find a building matching \"{phrase}\". Try the building's full name.")
        });
        FallbackReply {
            text,
            invocations: vec![invocation],
        }
    }

    async fn search(&self, ctx: &ToolContext, term: &str) -> (Option<String>, ToolInvocation) {
        let args = json!({ "queryType": "building", "searchTerm": term });
        let call = ToolCall {
            id: format!("fallback-{term}"),
            name: query_database::NAME.into(),
            arguments: args.clone(),
        };
        let result = dispatch_with_timeout(&self.tools, ctx, &call, self.tool_timeout).await;
        let found = directions(&result.data);
        debug!(term, found = found.is_some(), "Fallback building search");

        let invocation = ToolInvocation {
            name: call.name,
            args,
            result: Some(result.data),
        };
        (found, invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusdesk_store::{InMemoryStore, seed_demo};
    use campusdesk_tools::campus_registry;

    async fn responder() -> FallbackResponder {
        let store = Arc::new(InMemoryStore::new());
        seed_demo(store.as_ref()).await.unwrap();
        FallbackResponder::new(Arc::new(campus_registry(store)), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn library_question_searches_buildings() {
        let reply = responder()
            .await
            .respond(&Actor::guest(), "Where is the library")
            .await;
        assert!(reply.text.contains("University Library"));
        assert_eq!(reply.invocations.len(), 1);
        assert_eq!(reply.invocations[0].args["queryType"], "building");
        assert_eq!(reply.invocations[0].args["searchTerm"], "library");
    }

    #[tokio::test]
    async fn multi_word_falls_back_to_single_words() {
        let reply = responder()
            .await
            .respond(&Actor::guest(), "where is the sports arena?")
            .await;
        assert!(reply.text.contains("Sports Complex"));
        assert_eq!(reply.invocations[0].args["searchTerm"], "sports");
    }

    #[tokio::test]
    async fn unknown_building_is_still_recorded() {
        let reply = responder()
            .await
            .respond(&Actor::guest(), "Where is the observatory")
            .await;
        assert!(reply.text.contains("observatory"));
        assert_eq!(reply.invocations.len(), 1);
    }

    #[tokio::test]
    async fn greeting_and_menu() {
        let responder = responder().await;
        let hello = responder.respond(&Actor::guest(), "Hi there").await;
        assert!(hello.text.starts_with("Hello!"));
        assert!(hello.invocations.is_empty());

        let other = responder.respond(&Actor::guest(), "tell me a joke").await;
        assert_eq!(other.text, MENU);
    }

    #[tokio::test]
    async fn course_keyword() {
        let reply = responder()
            .await
            .respond(&Actor::guest(), "What courses are offered?")
            .await;
        assert!(reply.text.contains("Courses section"));
    }
}
