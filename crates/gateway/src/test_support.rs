//! Router fixtures for the handler tests.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use campusdesk_config::AppConfig;
use campusdesk_core::error::ProviderError;
use campusdesk_core::message::Message;
use campusdesk_core::provider::{Provider, ProviderRequest, ProviderResponse};
use campusdesk_store::{Stores, seed_demo};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::{GatewayState, SharedState, build_router};

/// Always answers with the same text.
pub struct EchoProvider(pub String);

#[async_trait::async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            message: Message::assistant(self.0.clone()),
            usage: None,
            model: "echo-model".into(),
        })
    }
}

pub struct TestApp {
    pub state: SharedState,
    pub router: Router,
}

impl TestApp {
    /// Seeded in-memory campus, no LLM.
    pub async fn new() -> Self {
        Self::with_provider(None).await
    }

    pub async fn with_provider(provider: Option<Arc<dyn Provider>>) -> Self {
        let stores = Stores::in_memory();
        seed_demo(stores.campus.as_ref()).await.unwrap();
        let state = Arc::new(GatewayState::new(AppConfig::default(), stores, provider));
        let router = build_router(state.clone());
        Self { state, router }
    }

    pub async fn token_for(&self, user_id: &str) -> String {
        let user = self.state.store.get_user(user_id).await.unwrap().unwrap();
        self.state.signer.issue_for(&user.to_actor(), Utc::now())
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn request(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Self::request("GET", uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Self::request("DELETE", uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send_json("POST", uri, token, body).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send_json("PUT", uri, token, body).await
    }

    async fn send_json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let request = Self::request(method, uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}
