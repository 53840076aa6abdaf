//! Google Gemini `generateContent` provider.
//!
//! Gemini has no system turn in `contents`; the system prompt travels as
//! `systemInstruction`. Assistant turns use the `model` role, tool calls are
//! `functionCall` parts, and tool results go back as `functionResponse` parts
//! keyed by function name.

use async_trait::async_trait;
use campusdesk_core::error::ProviderError;
use campusdesk_core::message::{Message, MessageRole, MessageToolCall};
use campusdesk_core::provider::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = crate::http_client("gemini", timeout);
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    fn to_contents(messages: &[Message]) -> Vec<Content> {
        messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| match m.role {
                MessageRole::Tool => Content {
                    role: "user".into(),
                    parts: vec![Part::FunctionResponse {
                        function_response: FunctionResponse {
                            name: m.tool_name.clone().unwrap_or_default(),
                            response: Self::response_object(&m.content),
                        },
                    }],
                },
                MessageRole::Assistant if !m.tool_calls.is_empty() => Content {
                    role: "model".into(),
                    parts: m
                        .tool_calls
                        .iter()
                        .map(|tc| Part::FunctionCall {
                            function_call: FunctionCall {
                                name: tc.name.clone(),
                                args: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                },
                MessageRole::Assistant => Content {
                    role: "model".into(),
                    parts: vec![Part::Text {
                        text: m.content.clone(),
                    }],
                },
                _ => Content {
                    role: "user".into(),
                    parts: vec![Part::Text {
                        text: m.content.clone(),
                    }],
                },
            })
            .collect()
    }

    /// `functionResponse.response` must be a JSON object.
    fn response_object(content: &str) -> Value {
        match serde_json::from_str::<Value>(content) {
            Ok(value @ Value::Object(_)) => value,
            Ok(other) => json!({ "result": other }),
            Err(_) => json!({ "result": content }),
        }
    }

    fn build_body(request: &ProviderRequest) -> Value {
        let mut body = json!({
            "contents": Self::to_contents(&request.messages),
            "generationConfig": {
                "temperature": request.temperature,
            },
        });

        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        if let Some(max_tokens) = request.max_tokens {
            body["generationConfig"]["maxOutputTokens"] = json!(max_tokens);
        }
        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }
        body
    }

    fn parse_response(api: ApiResponse, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
        let candidate = api.candidates.into_iter().next().ok_or_else(|| {
            let reason = api
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".into());
            ProviderError::InvalidResponse(format!("Gemini returned no answer: {reason}"))
        })?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            match part {
                Part::Text { text: t } => text.push_str(&t),
                Part::FunctionCall { function_call } => tool_calls.push(MessageToolCall {
                    // Gemini does not assign call ids.
                    id: uuid::Uuid::new_v4().to_string(),
                    name: function_call.name,
                    arguments: if function_call.args.is_null() {
                        json!({})
                    } else {
                        function_call.args
                    },
                }),
                Part::FunctionResponse { .. } => {}
            }
        }

        let mut message = Message::assistant(text);
        message.tool_calls = tool_calls;

        Ok(ProviderResponse {
            message,
            usage: api.usage_metadata.map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
            model: api.model_version.unwrap_or_else(|| requested_model.to_string()),
        })
    }
}

#[async_trait]
impl campusdesk_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let body = Self::build_body(&request);

        debug!(model = %request.model, tools = request.tools.len(), "Sending Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Gemini rejected the API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini returned error");
            if status == 400 && error_body.contains("API key not valid") {
                return Err(ProviderError::AuthenticationFailed(
                    "Gemini rejected the API key".into(),
                ));
            }
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Self::parse_response(api, &request.model)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

// --- Gemini API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}
