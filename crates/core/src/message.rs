//! Message and Conversation domain types.
//!
//! A chat turn flows: client sends a message → the orchestrator talks to the
//! LLM (possibly running tools) → the reply and the user message are appended
//! to the actor's conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender.
///
/// `Tool` only appears in the in-flight transcript sent to the LLM; persisted
/// conversations hold user and assistant turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Provider-assigned call id (synthesised when the provider has none)
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Audit record of one tool execution during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub args: serde_json::Value,
    /// Absent until the tool has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl ToolInvocation {
    /// The `type` tag of the structured result, if any.
    pub fn result_type(&self) -> Option<&str> {
        self.result.as_ref()?.get("type")?.as_str()
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default = "new_message_id")]
    pub id: String,

    pub role: MessageRole,

    pub content: String,

    /// Client-supplied history may omit it
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Tool calls requested by the assistant (in-flight transcript only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// If this is a tool result, the tool that produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Tools the assistant ran to produce this message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_invocations: Vec<ToolInvocation>,
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    fn with_role(role: MessageRole, content: String) -> Self {
        Self {
            id: new_message_id(),
            role,
            content,
            timestamp: Utc::now(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
            tool_invocations: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content.into())
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content.into())
    }

    /// A tool result answering `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut msg = Self::with_role(MessageRole::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg.tool_name = Some(name.into());
        msg
    }

    pub fn with_invocations(mut self, invocations: Vec<ToolInvocation>) -> Self {
        self.tool_invocations = invocations;
        self
    }
}

/// An ordered sequence of messages owned by one actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,

    /// Owning user id
    pub owner: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub messages: Vec<Message>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency counter, bumped on every append
    #[serde(default)]
    pub version: u64,
}

/// Maximum characters kept from the first user message as a title.
pub const TITLE_MAX_CHARS: usize = 50;

impl Conversation {
    pub fn new(owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            owner: owner.into(),
            title: None,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Add a message, deriving the title from the first user message.
    pub fn push(&mut self, message: Message) {
        if self.title.is_none() && message.role == MessageRole::User {
            self.title = Some(message.content.chars().take(TITLE_MAX_CHARS).collect());
        }
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.to_string(),
            title: self.title.clone().unwrap_or_else(|| "New conversation".into()),
            last_message: self
                .messages
                .last()
                .map(|m| m.content.chars().take(100).collect())
                .unwrap_or_default(),
            last_activity: self.updated_at,
            message_count: self.messages.len(),
        }
    }
}

/// Listing projection of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub last_message: String,
    pub last_activity: DateTime<Utc>,
    pub message_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello!");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "Hello!");
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn title_comes_from_first_user_message() {
        let mut conv = Conversation::new("u1");
        conv.push(Message::assistant("Welcome"));
        conv.push(Message::user("x".repeat(80)));
        conv.push(Message::user("second"));
        assert_eq!(conv.title.as_deref().map(str::len), Some(TITLE_MAX_CHARS));
    }

    #[test]
    fn summary_reports_last_message() {
        let mut conv = Conversation::new("u1");
        conv.push(Message::user("Where is the library?"));
        conv.push(Message::assistant("Beside the main gate."));
        let summary = conv.summary();
        assert_eq!(summary.message_count, 2);
        assert_eq!(summary.last_message, "Beside the main gate.");
        assert_eq!(summary.title, "Where is the library?");
    }

    #[test]
    fn invocation_result_type() {
        let inv = ToolInvocation {
            name: "getNews".into(),
            args: serde_json::json!({}),
            result: Some(serde_json::json!({"type": "news", "items": []})),
        };
        assert_eq!(inv.result_type(), Some("news"));
    }

    #[test]
    fn message_serializes_camel_case() {
        let msg = Message::assistant("ok").with_invocations(vec![ToolInvocation {
            name: "queryDatabase".into(),
            args: serde_json::json!({"queryType": "building"}),
            result: None,
        }]);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("toolInvocations"));
    }
}
