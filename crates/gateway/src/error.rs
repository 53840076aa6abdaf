//! API error responses.
//!
//! Every failure renders as `{"success": false, "message": ...}` with the
//! status picked by the variant. Internal failures carry their detail in a
//! response extension; [`reveal_internal_errors`] copies it into the body
//! outside production.

use axum::Json;
use axum::extract::Request;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use campusdesk_core::error::{Error, StoreError};
use campusdesk_policy::DenyReason;
use campusdesk_security::TokenError;
use serde_json::json;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or malformed input.
    Validation(String),
    /// Missing, malformed or expired credentials.
    Unauthorized(String),
    /// The access policy refused the request.
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

/// Detail of a 500, attached to the response for [`reveal_internal_errors`].
#[derive(Debug, Clone)]
struct InternalDetail(String);

const INTERNAL_MESSAGE: &str = "Something went wrong on our side. Please try again later.";

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Request failed");
                let mut response = body(status, INTERNAL_MESSAGE);
                response.extensions_mut().insert(InternalDetail(detail));
                response
            }
            ApiError::Validation(message)
            | ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message) => body(status, &message),
        }
    }
}

/// Development-only middleware: show the internal error detail in 500
/// bodies.
pub async fn reveal_internal_errors(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    match response.extensions().get::<InternalDetail>() {
        Some(InternalDetail(detail)) => body(response.status(), detail),
        None => response,
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(message) => ApiError::Validation(message),
            Error::Store(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DenyReason> for ApiError {
    fn from(reason: DenyReason) -> Self {
        ApiError::Forbidden(reason.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        ApiError::Unauthorized(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

/// `Json` whose rejection renders as an [`ApiError`].
#[derive(axum::extract::FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejection renders as an [`ApiError`].
#[derive(axum::extract::FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
