//! Generative-AI provider clients for CampusDesk.
//!
//! All providers implement the `campusdesk_core::Provider` trait.
//! [`build_from_config`] constructs the configured client once at startup;
//! `None` means the assistant runs on the local fallback responder only.

pub mod gemini;
pub mod openai_compat;
pub mod router;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;

use std::time::Duration;

/// HTTP client with the request timeout applied.
pub(crate) fn http_client(provider: &str, timeout: Duration) -> reqwest::Client {
    finish_client(provider, reqwest::Client::builder().timeout(timeout))
}

/// A builder that fails (bad TLS backend, invalid proxy settings) yields the
/// default client, which has no request timeout; the orchestrator's own
/// deadline still bounds every call.
fn finish_client(provider: &str, builder: reqwest::ClientBuilder) -> reqwest::Client {
    match builder.build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(provider, error = %e, "HTTP client setup failed; using defaults without a request timeout");
            reqwest::Client::new()
        }
    }
}
