//! Fee catalogs published by the bursary.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use campusdesk_core::catalog::{FeeCatalog, FeeItem, resolve_fee_catalog};
use campusdesk_policy::check_fee_write;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::SharedState;
use crate::auth::RequireActor;
use crate::error::{ApiError, ApiJson, ApiQuery};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/bursary/fees", get(list_handler).post(create_handler))
        .route("/bursary/fees/find", get(find_handler))
        .route("/bursary/fees/acknowledge", post(acknowledge_handler))
}

async fn list_handler(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let catalogs = state.store.list_fee_catalogs().await?;
    let unseen = catalogs.iter().filter(|c| c.is_new).count();
    Ok(Json(json!({
        "success": true,
        "count": catalogs.len(),
        "unseen": unseen,
        "catalogs": catalogs,
    })))
}

#[derive(Deserialize)]
struct FindParams {
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    session: Option<String>,
}

async fn find_handler(
    State(state): State<SharedState>,
    ApiQuery(params): ApiQuery<FindParams>,
) -> Result<Json<Value>, ApiError> {
    let catalogs = state.store.list_fee_catalogs().await?;
    let catalog = resolve_fee_catalog(&catalogs, params.level.as_deref(), params.session.as_deref())
        .ok_or_else(|| ApiError::NotFound("No fee catalog found".into()))?;
    Ok(Json(json!({
        "success": true,
        "total": catalog.total(),
        "catalog": catalog,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeCatalogInput {
    level: String,
    session: String,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    effective_date: Option<NaiveDate>,
    items: Vec<FeeItem>,
}

async fn create_handler(
    State(state): State<SharedState>,
    RequireActor(actor): RequireActor,
    ApiJson(input): ApiJson<FeeCatalogInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if let Err(reason) = check_fee_write(&actor).into_result() {
        warn!(actor_id = %actor.id, role = %actor.role, %reason, "Fee catalog write denied");
        state.audit.denied(&actor.id, "bursary/fees", "fees.create");
        return Err(reason.into());
    }
    if input.level.trim().is_empty() || input.session.trim().is_empty() {
        return Err(ApiError::Validation("Level and session are required".into()));
    }
    if input.items.is_empty() {
        return Err(ApiError::Validation("A fee catalog needs at least one item".into()));
    }
    if let Some(item) = input.items.iter().find(|i| i.name.trim().is_empty() || i.amount < 0.0) {
        return Err(ApiError::Validation(format!(
            "Invalid fee item \"{}\": names are required and amounts cannot be negative",
            item.name
        )));
    }

    let now = Utc::now();
    let catalog = FeeCatalog {
        id: Uuid::new_v4().to_string(),
        level: input.level.trim().to_string(),
        session: input.session.trim().to_string(),
        currency: input.currency.unwrap_or_else(|| "NGN".into()),
        effective_date: input.effective_date.unwrap_or_else(|| now.date_naive()),
        items: input.items,
        is_new: true,
        active: true,
        created_at: now,
    };
    state.store.upsert_fee_catalog(catalog.clone()).await?;

    state.audit.changed(&actor.id, "fee_catalog", &catalog.id, "create");
    info!(actor_id = %actor.id, level = %catalog.level, session = %catalog.session, "Fee catalog published");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "catalog": catalog }))))
}

/// Clears the "new" badge on every catalog. Best effort, not transactional.
async fn acknowledge_handler(
    State(state): State<SharedState>,
    RequireActor(actor): RequireActor,
) -> Result<Json<Value>, ApiError> {
    let updated = state.store.acknowledge_fee_catalogs().await?;
    info!(actor_id = %actor.id, updated, "Fee catalogs acknowledged");
    Ok(Json(json!({ "success": true, "updated": updated })))
}
