//! News endpoints. Reads are filtered by the visibility table; writes go
//! through the news mutation rule and are soft deletes only.

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use campusdesk_core::news::{Audience, News};
use campusdesk_core::store::NEWS_LIMIT;
use campusdesk_core::Actor;
use campusdesk_policy::{
    Decision, NewsTarget, can_view, check_news_create, check_news_delete, check_news_update,
    visibility_scope,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::SharedState;
use crate::auth::{OptionalActor, RequireActor};
use crate::error::{ApiError, ApiJson, ApiQuery};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/news", get(list_handler).post(create_handler))
        .route(
            "/news/{id}",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
}

#[derive(Deserialize)]
struct ListParams {
    /// Comma-separated.
    #[serde(default)]
    tags: Option<String>,
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

async fn list_handler(
    State(state): State<SharedState>,
    OptionalActor(actor): OptionalActor,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let scope = visibility_scope(&actor).with_tags(split_tags(params.tags.as_deref()));
    let news = state.store.list_news(&scope, NEWS_LIMIT).await?;
    Ok(Json(json!({ "success": true, "count": news.len(), "news": news })))
}

async fn get_handler(
    State(state): State<SharedState>,
    OptionalActor(actor): OptionalActor,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.store.get_news(&id).await? {
        Some(news) if can_view(&actor, &news) => Ok(Json(json!({ "success": true, "news": news }))),
        _ => Err(ApiError::not_found("News item")),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsInput {
    title: String,
    content: String,
    audience: Audience,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    courses: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsPatch {
    title: Option<String>,
    content: Option<String>,
    audience: Option<Audience>,
    department: Option<String>,
    courses: Option<Vec<String>>,
    tags: Option<Vec<String>>,
}

/// The scoping field an audience selects must be present.
fn validate_target(target: &NewsTarget) -> Result<(), ApiError> {
    match target.audience {
        Audience::DepartmentSpecific if target.department.as_deref().is_none_or(str::is_empty) => Err(
            ApiError::Validation("Department-specific news needs a department".into()),
        ),
        Audience::CourseSpecific if target.courses.is_empty() => Err(ApiError::Validation(
            "Course-specific news needs at least one course".into(),
        )),
        _ => Ok(()),
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Record a denial and turn it into a 403.
fn enforce(state: &SharedState, actor: &Actor, target: &str, capability: &str, decision: Decision) -> Result<(), ApiError> {
    decision.into_result().map_err(|reason| {
        warn!(actor_id = %actor.id, role = %actor.role, target, %reason, "News write denied");
        state.audit.denied(&actor.id, target, capability);
        ApiError::from(reason)
    })
}

async fn create_handler(
    State(state): State<SharedState>,
    RequireActor(actor): RequireActor,
    ApiJson(input): ApiJson<NewsInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_text("Title", &input.title)?;
    require_text("Content", &input.content)?;
    let target = NewsTarget {
        audience: input.audience,
        department: input.department,
        courses: input.courses,
    };
    validate_target(&target)?;
    enforce(&state, &actor, "news", "news.create", check_news_create(&actor, &target))?;

    let now = Utc::now();
    let mut news = News {
        id: Uuid::new_v4().to_string(),
        title: input.title.trim().to_string(),
        content: input.content,
        audience: target.audience,
        department: target.department,
        courses: target.courses,
        tags: input.tags,
        author: actor.id.clone(),
        active: true,
        created_at: now,
        updated_at: now,
    };
    news.normalize_scope();
    state.store.upsert_news(news.clone()).await?;

    state.audit.changed(&actor.id, "news", &news.id, "create");
    info!(actor_id = %actor.id, news_id = %news.id, audience = news.audience.as_str(), "News created");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "news": news }))))
}

/// Active items only; soft-deleted news cannot be edited back to life.
async fn load_active(state: &SharedState, id: &str) -> Result<News, ApiError> {
    match state.store.get_news(id).await? {
        Some(news) if news.active => Ok(news),
        _ => Err(ApiError::not_found("News item")),
    }
}

async fn update_handler(
    State(state): State<SharedState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<NewsPatch>,
) -> Result<Json<Value>, ApiError> {
    let existing = load_active(&state, &id).await?;

    let audience = patch.audience.unwrap_or(existing.audience);
    let target = NewsTarget {
        audience,
        department: patch.department.or_else(|| existing.department.clone()),
        courses: patch.courses.unwrap_or_else(|| existing.courses.clone()),
    };
    validate_target(&target)?;
    enforce(&state, &actor, &id, "news.update", check_news_update(&actor, &existing, &target))?;

    let mut news = existing;
    if let Some(title) = patch.title {
        require_text("Title", &title)?;
        news.title = title.trim().to_string();
    }
    if let Some(content) = patch.content {
        require_text("Content", &content)?;
        news.content = content;
    }
    if let Some(tags) = patch.tags {
        news.tags = tags;
    }
    news.audience = target.audience;
    news.department = target.department;
    news.courses = target.courses;
    news.normalize_scope();
    news.updated_at = Utc::now();
    state.store.upsert_news(news.clone()).await?;

    state.audit.changed(&actor.id, "news", &id, "update");
    Ok(Json(json!({ "success": true, "news": news })))
}

async fn delete_handler(
    State(state): State<SharedState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut news = load_active(&state, &id).await?;
    enforce(&state, &actor, &id, "news.delete", check_news_delete(&actor, &news))?;

    news.active = false;
    news.updated_at = Utc::now();
    state.store.upsert_news(news).await?;

    state.audit.changed(&actor.id, "news", &id, "delete");
    Ok(Json(json!({ "success": true, "message": "News item deleted" })))
}
