//! Selects the generative-AI backend from configuration.

use crate::gemini::{self, GeminiProvider};
use crate::openai_compat::OpenAiCompatProvider;
use campusdesk_config::LlmConfig;
use campusdesk_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build the configured provider, or `None` when the assistant should run
/// without one (provider `none`, or no API key).
pub fn build_from_config(config: &LlmConfig) -> Option<Arc<dyn Provider>> {
    if !config.is_enabled() {
        info!(provider = %config.provider, "No LLM configured, using fallback responses only");
        return None;
    }

    let api_key = config.api_key.clone().unwrap_or_default();
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let name = config.provider.as_str();

    let provider: Arc<dyn Provider> = match name {
        "gemini" => Arc::new(GeminiProvider::with_base_url(
            config
                .api_url
                .clone()
                .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.into()),
            api_key,
            timeout,
        )),
        _ => {
            let Some(base_url) = config.api_url.clone().or_else(|| default_base_url(name)) else {
                warn!(provider = name, "Unknown LLM provider without llm.api_url; disabling LLM");
                return None;
            };
            Arc::new(OpenAiCompatProvider::new(name, base_url, api_key, timeout))
        }
    };

    info!(provider = name, model = %config.model, "LLM provider ready");
    Some(provider)
}

/// Base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        _ => return None,
    };
    Some(url.to_string())
}
