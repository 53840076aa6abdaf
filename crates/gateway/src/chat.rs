//! Chat endpoints: one turn through the orchestrator, and the caller's saved
//! conversations.

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use campusdesk_agent::ChatTurn;
use campusdesk_core::message::{ConversationSummary, Message, ToolInvocation};
use serde::Serialize;
use tracing::info;

use crate::SharedState;
use crate::auth::OptionalActor;
use crate::error::{ApiError, ApiJson};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/chat/message", post(message_handler))
        .route("/chat/conversations", get(list_handler))
        .route("/chat/conversations/{id}", get(get_handler))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    success: bool,
    conversation_id: Option<String>,
    message: String,
    has_location: bool,
    function_calls: Vec<ToolInvocation>,
}

async fn message_handler(
    State(state): State<SharedState>,
    OptionalActor(actor): OptionalActor,
    ApiJson(turn): ApiJson<ChatTurn>,
) -> Result<Json<ChatResponse>, ApiError> {
    info!(actor_id = %actor.id, role = %actor.role, message_len = turn.message.len(), "Chat message received");

    let reply = state.orchestrator.converse(&actor, turn).await?;
    Ok(Json(ChatResponse {
        success: true,
        conversation_id: reply.conversation_id,
        message: reply.reply,
        has_location: reply.has_location,
        function_calls: reply.invocations,
    }))
}

#[derive(Serialize)]
struct ConversationList {
    success: bool,
    conversations: Vec<ConversationSummary>,
}

async fn list_handler(
    State(state): State<SharedState>,
    OptionalActor(actor): OptionalActor,
) -> Result<Json<ConversationList>, ApiError> {
    let conversations = if actor.is_guest() {
        Vec::new()
    } else {
        state.orchestrator.conversations().list_conversations(&actor.id).await?
    };
    Ok(Json(ConversationList {
        success: true,
        conversations,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationDetail {
    success: bool,
    id: String,
    title: Option<String>,
    messages: Vec<Message>,
}

/// The owner's conversation; anyone else gets 404.
async fn get_handler(
    State(state): State<SharedState>,
    OptionalActor(actor): OptionalActor,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let conversation = match state.orchestrator.conversations().get_conversation(&id).await? {
        Some(c) if !actor.is_guest() && c.owner == actor.id => c,
        _ => return Err(ApiError::not_found("Conversation")),
    };
    Ok(Json(ConversationDetail {
        success: true,
        id: conversation.id.to_string(),
        title: conversation.title,
        messages: conversation.messages,
    }))
}
