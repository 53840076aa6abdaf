//! HTTP API gateway for CampusDesk.
//!
//! Exposes the chat endpoint, the campus catalogs, news, the bursary's fee
//! catalogs and token endpoints as JSON over HTTP.
//!
//! Built on Axum; every route shares one [`GatewayState`].

pub mod auth;
pub mod bursary;
pub mod catalog;
pub mod chat;
pub mod error;
pub mod news;

#[cfg(test)]
pub(crate) mod test_support;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, extract::State, middleware, response::Json, routing::get};
use campusdesk_agent::{ChatOrchestrator, OrchestratorSettings};
use campusdesk_config::AppConfig;
use campusdesk_core::event::EventBus;
use campusdesk_core::provider::Provider;
use campusdesk_core::store::CampusStore;
use campusdesk_security::{AuditLogger, TokenSigner};
use campusdesk_store::Stores;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub use error::ApiError;

/// Shared application state for every route.
pub struct GatewayState {
    pub config: AppConfig,
    pub store: Arc<dyn CampusStore>,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub signer: TokenSigner,
    pub audit: Arc<AuditLogger>,
    pub events: Arc<EventBus>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Wire the orchestrator and security services around `stores`.
    ///
    /// `provider` is `None` when no LLM is configured; chat then always takes
    /// the local fallback.
    pub fn new(config: AppConfig, stores: Stores, provider: Option<Arc<dyn Provider>>) -> Self {
        let events = Arc::new(EventBus::default());
        let tools = Arc::new(campusdesk_tools::campus_registry(stores.campus.clone()));
        let orchestrator = Arc::new(ChatOrchestrator::new(
            provider,
            tools,
            stores.conversations.clone(),
            events.clone(),
            OrchestratorSettings::from_config(&config.llm),
        ));
        Self {
            signer: TokenSigner::from_config(&config.auth),
            audit: Arc::new(AuditLogger::tracing()),
            store: stores.campus,
            orchestrator,
            events,
            start_time: chrono::Utc::now(),
            config,
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Build the Axum router with all routes.
///
/// Layers applied:
/// - CORS restricted to `gateway.cors_origins` (same-origin when empty)
/// - Request body size limit (`gateway.body_limit_bytes`)
/// - Internal error detail in 500 bodies outside production
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .merge(auth::router())
        .merge(chat::router())
        .merge(news::router())
        .merge(catalog::router())
        .merge(bursary::router())
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(state.config.gateway.body_limit_bytes));

    if !state.config.is_production() {
        router = router.layer(middleware::from_fn(error::reveal_internal_errors));
    }

    router
        .layer(cors_layer(&state.config.gateway.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server on the configured address.
pub async fn start(
    config: AppConfig,
    stores: Stores,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = campusdesk_providers::router::build_from_config(&config.llm);
    if provider.is_none() {
        warn!("No LLM provider configured; chat will use the local fallback");
    }

    let backend = stores.backend().to_string();
    let state = Arc::new(GatewayState::new(config, stores, provider));
    let app = build_router(state);

    info!(addr = %addr, store = %backend, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    llm: String,
    store: String,
    uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        llm: state
            .orchestrator
            .provider_name()
            .unwrap_or("fallback")
            .to_string(),
        store: state.store.name().to_string(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["llm"], "fallback");
        assert_eq!(body["store"], "in_memory");
    }

    #[tokio::test]
    async fn health_names_configured_provider() {
        let app = TestApp::with_provider(Some(Arc::new(EchoProvider("hi".into())))).await;
        let (_, body) = app.get("/health", None).await;
        assert_eq!(body["llm"], "echo");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut config = AppConfig::default();
        config.gateway.body_limit_bytes = 64;
        let state = Arc::new(GatewayState::new(config, Stores::in_memory(), None));
        let app = build_router(state);

        let body = serde_json::json!({ "message": "x".repeat(500) }).to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/chat/message")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_ne!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let mut config = AppConfig::default();
        config.gateway.cors_origins = vec!["http://localhost:3000".into()];
        let state = Arc::new(GatewayState::new(config, Stores::in_memory(), None));
        let app = build_router(state);

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/news")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
    }
}
