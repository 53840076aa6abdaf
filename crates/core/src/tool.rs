//! Tool trait: the local functions the LLM may ask the orchestrator to run.
//!
//! Tools never fail past the registry boundary: [`ToolRegistry::dispatch`]
//! turns unknown names and internal errors into an error-shaped
//! [`ToolResult`] (`{"type": "error", "message": ...}`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::actor::Actor;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool call id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Who a tool is running on behalf of.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub actor: Actor,
}

impl ToolContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// Tagged payload: `{"type": ..., ...}`
    pub data: serde_json::Value,
}

impl ToolResult {
    /// A successful result tagged with `kind`. `payload` must be a JSON
    /// object; its fields are merged next to the tag.
    pub fn ok(kind: &str, payload: serde_json::Value) -> Self {
        let mut data = serde_json::Map::new();
        data.insert("type".into(), serde_json::Value::String(kind.into()));
        if let serde_json::Value::Object(fields) = payload {
            data.extend(fields);
        }
        Self {
            success: true,
            data: serde_json::Value::Object(data),
        }
    }

    /// An error-shaped result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: serde_json::json!({ "type": "error", "message": message.into() }),
        }
    }

    pub fn kind(&self) -> &str {
        self.data.get("type").and_then(|t| t.as_str()).unwrap_or("unknown")
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool as exposed to the LLM (e.g., "getNews").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The orchestrator uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up and execute tools when the LLM requests them
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions, sorted by name for a stable prompt.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call, surfacing errors.
    pub async fn execute(
        &self,
        ctx: &ToolContext,
        call: &ToolCall,
    ) -> std::result::Result<ToolResult, ToolError> {
        let tool = self.tools.get(&call.name).ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.execute(ctx, call.arguments.clone()).await
    }

    /// Execute a tool call; never fails.
    pub async fn dispatch(&self, ctx: &ToolContext, call: &ToolCall) -> ToolResult {
        match self.execute(ctx, call).await {
            Ok(result) => result,
            Err(ToolError::NotFound(name)) => ToolResult::error(format!("Unknown function: {name}")),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolResult::error(e.to_string())
            }
        }
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
