//! Read-mostly campus catalogs: buildings, departments, courses and quizzes.
//! Course writes follow the course-offering sub-policy.

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use campusdesk_core::catalog::{Course, CourseQuery};
use campusdesk_core::Actor;
use campusdesk_policy::{CourseUpdate, apply_course_update, check_course_create, stamp_new_offerings};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::SharedState;
use crate::auth::{OptionalActor, RequireActor};
use crate::error::{ApiError, ApiJson, ApiQuery};

/// Listing cap for catalog endpoints.
const LIST_LIMIT: usize = 100;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/buildings", get(list_buildings))
        .route("/buildings/{id}", get(get_building))
        .route("/departments", get(list_departments))
        .route("/departments/{id}", get(get_department))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", get(get_course).put(update_course))
        .route("/quizzes", get(list_quizzes))
        .route("/quizzes/{id}", get(get_quiz))
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    search: Option<String>,
}

async fn list_buildings(
    State(state): State<SharedState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let term = params.search.unwrap_or_default();
    let buildings = state.store.search_buildings(term.trim(), LIST_LIMIT).await?;
    Ok(Json(json!({ "success": true, "count": buildings.len(), "buildings": buildings })))
}

async fn get_building(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.store.get_building(&id).await? {
        Some(building) if building.active => Ok(Json(json!({ "success": true, "building": building }))),
        _ => Err(ApiError::not_found("Building")),
    }
}

async fn list_departments(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let departments = state.store.search_departments("", LIST_LIMIT).await?;
    Ok(Json(json!({ "success": true, "count": departments.len(), "departments": departments })))
}

async fn get_department(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.store.get_department(&id).await? {
        Some(department) if department.active => {
            Ok(Json(json!({ "success": true, "department": department })))
        }
        _ => Err(ApiError::not_found("Department")),
    }
}

async fn list_courses(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<CourseQuery>,
) -> Result<Json<Value>, ApiError> {
    let courses = state.store.list_courses(&query, LIST_LIMIT).await?;
    Ok(Json(json!({ "success": true, "count": courses.len(), "courses": courses })))
}

async fn load_course(state: &SharedState, id: &str) -> Result<Course, ApiError> {
    match state.store.get_course(id).await? {
        Some(course) if course.active => Ok(course),
        _ => Err(ApiError::not_found("Course")),
    }
}

async fn get_course(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let course = load_course(&state, &id).await?;
    Ok(Json(json!({ "success": true, "course": course })))
}

/// Ids default to the lower-cased code without spaces ("CSC 101" -> "csc101").
fn course_id(course: &Course) -> String {
    if !course.id.trim().is_empty() {
        return course.id.trim().to_string();
    }
    course
        .code
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn deny(state: &SharedState, actor: &Actor, target: &str, capability: &str, reason: campusdesk_policy::DenyReason) -> ApiError {
    warn!(actor_id = %actor.id, role = %actor.role, target, %reason, "Course write denied");
    state.audit.denied(&actor.id, target, capability);
    reason.into()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseInput {
    #[serde(default)]
    id: String,
    code: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    credit_units: u8,
    level: u16,
    department: String,
    #[serde(default)]
    departments_offering: Vec<campusdesk_core::catalog::CourseOffering>,
}

async fn create_course(
    State(state): State<SharedState>,
    RequireActor(actor): RequireActor,
    ApiJson(input): ApiJson<CourseInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if input.code.trim().is_empty() || input.title.trim().is_empty() {
        return Err(ApiError::Validation("Course code and title are required".into()));
    }
    let mut course = Course {
        id: input.id,
        code: input.code.trim().to_string(),
        title: input.title.trim().to_string(),
        description: input.description,
        credit_units: input.credit_units,
        level: input.level,
        department: input.department,
        departments_offering: input.departments_offering,
        active: true,
    };
    course.id = course_id(&course);

    if let Err(reason) = check_course_create(&actor, &course).into_result() {
        return Err(deny(&state, &actor, &course.id, "course.create", reason));
    }
    if state.store.get_course(&course.id).await?.is_some() {
        return Err(ApiError::Validation(format!("Course {} already exists", course.id)));
    }

    stamp_new_offerings(&actor, &mut course, Utc::now());
    state.store.upsert_course(course.clone()).await?;

    state.audit.changed(&actor.id, "course", &course.id, "create");
    info!(actor_id = %actor.id, course_id = %course.id, "Course created");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "course": course }))))
}

async fn update_course(
    State(state): State<SharedState>,
    RequireActor(actor): RequireActor,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<CourseUpdate>,
) -> Result<Json<Value>, ApiError> {
    let existing = load_course(&state, &id).await?;
    let course = apply_course_update(&actor, &existing, update, Utc::now())
        .map_err(|reason| deny(&state, &actor, &id, "course.update", reason))?;
    state.store.upsert_course(course.clone()).await?;

    state.audit.changed(&actor.id, "course", &id, "update");
    Ok(Json(json!({ "success": true, "course": course })))
}

#[derive(Deserialize)]
struct QuizParams {
    #[serde(default)]
    course: Option<String>,
}

async fn list_quizzes(
    State(state): State<SharedState>,
    OptionalActor(actor): OptionalActor,
    ApiQuery(params): ApiQuery<QuizParams>,
) -> Result<Json<Value>, ApiError> {
    let quizzes: Vec<_> = state
        .store
        .list_quizzes(params.course.as_deref())
        .await?
        .into_iter()
        .map(|q| if actor.role.is_admin() { q } else { q.without_answers() })
        .collect();
    Ok(Json(json!({ "success": true, "count": quizzes.len(), "quizzes": quizzes })))
}

async fn get_quiz(
    State(state): State<SharedState>,
    OptionalActor(actor): OptionalActor,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.store.get_quiz(&id).await? {
        Some(quiz) if quiz.active => {
            let quiz = if actor.role.is_admin() { quiz } else { quiz.without_answers() };
            Ok(Json(json!({ "success": true, "quiz": quiz })))
        }
        _ => Err(ApiError::not_found("Quiz")),
    }
}
