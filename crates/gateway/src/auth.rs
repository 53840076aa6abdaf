//! Bearer-token authentication.
//!
//! [`OptionalActor`] turns a missing token into a guest and rejects a bad
//! one; [`RequireActor`] also rejects a missing token. Every rejection is
//! written to the audit log.

use axum::Json;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Router, http::StatusCode};
use campusdesk_core::Actor;
use campusdesk_security::{AuditEvent, AuditOutcome, TokenError, bearer_token};
use chrono::Utc;
use serde_json::json;
use tracing::debug;

use crate::SharedState;
use crate::error::ApiError;

/// The caller, or a guest when no token was sent.
#[derive(Debug, Clone)]
pub struct OptionalActor(pub Actor);

/// The caller; a token is mandatory.
#[derive(Debug, Clone)]
pub struct RequireActor(pub Actor);

/// `None` when the request carries no `Authorization` header.
fn authenticate(parts: &Parts, state: &SharedState) -> Result<Option<Actor>, ApiError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let result = header
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or(TokenError::Malformed)
        .and_then(|token| state.signer.verify(token));

    match result {
        Ok(claims) => {
            let actor = claims.to_actor();
            debug!(actor_id = %actor.id, role = %actor.role, "Authenticated request");
            Ok(Some(actor))
        }
        Err(e) => {
            state.audit.auth_failure(parts.uri.path(), &e.to_string());
            Err(e.into())
        }
    }
}

impl FromRequestParts<SharedState> for OptionalActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        Ok(OptionalActor(authenticate(parts, state)?.unwrap_or_else(Actor::guest)))
    }
}

impl FromRequestParts<SharedState> for RequireActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        match authenticate(parts, state)? {
            Some(actor) => Ok(RequireActor(actor)),
            None => {
                state.audit.auth_failure(parts.uri.path(), &TokenError::Missing.to_string());
                Err(TokenError::Missing.into())
            }
        }
    }
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/auth/guest", post(guest_token_handler))
        .route("/auth/me", get(me_handler))
}

/// Issue a short-lived guest token for clients that always send one.
async fn guest_token_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let actor = Actor::guest();
    let token = state.signer.issue_for(&actor, Utc::now());
    state.audit.log(
        AuditEvent::TokenIssued,
        &actor.id,
        "/auth/guest",
        AuditOutcome::Success,
        None,
    );
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "token": token, "user": actor })),
    )
}

async fn me_handler(
    State(state): State<SharedState>,
    OptionalActor(actor): OptionalActor,
) -> Result<Json<serde_json::Value>, ApiError> {
    let profile = if actor.is_guest() {
        None
    } else {
        state.store.get_user(&actor.id).await?
    };
    Ok(Json(json!({
        "success": true,
        "user": actor,
        "profile": profile,
    })))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;
    use campusdesk_core::Role;
    use campusdesk_security::AuditOutcome;

    #[tokio::test]
    async fn me_without_token_is_guest() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/auth/me", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "guest");
        assert!(body["profile"].is_null());
    }

    #[tokio::test]
    async fn me_with_token_resolves_directory_profile() {
        let app = TestApp::new().await;
        let token = app.token_for("stu-ada").await;
        let (status, body) = app.get("/auth/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], "stu-ada");
        assert_eq!(body["user"]["role"], Role::Student.as_str());
        assert_eq!(body["profile"]["name"], "Ada Nwosu");
    }

    #[tokio::test]
    async fn invalid_token_is_rejected_and_audited() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/news", Some("not-a-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Malformed token, please log in again");
        assert_eq!(app.state.audit.entries_by_outcome(&AuditOutcome::Denied).len(), 1);
    }

    #[tokio::test]
    async fn token_from_another_secret_has_bad_signature() {
        let app = TestApp::new().await;
        let forged = campusdesk_security::TokenSigner::new(
            "some-other-secret-entirely",
            "campusdesk",
            chrono::Duration::hours(1),
        )
        .issue_for(&campusdesk_core::Actor::new("admin", Role::SystemAdmin), chrono::Utc::now());
        let (status, body) = app.get("/auth/me", Some(&forged)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token signature, please log in again");
    }

    #[tokio::test]
    async fn guest_token_round_trips() {
        let app = TestApp::new().await;
        let (status, body) = app.post("/auth/guest", None, serde_json::json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = app.get("/auth/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "guest");
    }
}
