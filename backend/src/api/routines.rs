use crate::{
    api::validation::{MAX_LABEL_LEN, MAX_TITLE_LEN, check_length},
    db::{DbPool, with_conn},
    error::ApiError,
    models::{Routine, RoutineChangeset},
    services::{
        auth::Claims,
        routines,
        time_format::{format_time_of_day, parse_optional_time_of_day},
    },
};
use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Body of both create and update; update replaces every field.
#[derive(Deserialize)]
pub struct RoutineRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub routine_type: String,
    #[serde(default)]
    pub goal_value: Option<i32>,
    #[serde(default)]
    pub duration_seconds: Option<i32>,
    /// `HH:MM`
    #[serde(default)]
    pub deadline_time: Option<String>,
    #[serde(default)]
    pub success_note: Option<String>,
}

impl RoutineRequest {
    pub fn into_changeset(self) -> Result<RoutineChangeset, ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation("title must not be empty".to_string()));
        }
        check_length("title", &self.title, MAX_TITLE_LEN)?;
        check_length("type", &self.routine_type, MAX_LABEL_LEN)?;
        let deadline_time = parse_optional_time_of_day(self.deadline_time.as_deref())?;

        Ok(RoutineChangeset {
            title: self.title,
            routine_type: self.routine_type,
            goal_value: self.goal_value,
            duration_seconds: self.duration_seconds,
            deadline_time,
            success_note: self.success_note,
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RoutineResponse {
    pub routine_id: String,
    pub user_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub routine_type: String,
    pub goal_value: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub deadline_time: Option<String>,
    pub success_note: Option<String>,
}

impl From<Routine> for RoutineResponse {
    fn from(routine: Routine) -> Self {
        Self {
            deadline_time: routine.deadline_time.as_ref().map(format_time_of_day),
            routine_id: routine.routine_id,
            user_id: routine.user_id,
            title: routine.title,
            routine_type: routine.routine_type,
            goal_value: routine.goal_value,
            duration_seconds: routine.duration_seconds,
            success_note: routine.success_note,
        }
    }
}

// ============================================================================
// Endpoints
// ============================================================================

#[post("")]
pub async fn create_routine(
    pool: web::Data<DbPool>,
    claims: Claims,
    body: web::Json<RoutineRequest>,
) -> Result<HttpResponse, ApiError> {
    let fields = body.into_inner().into_changeset()?;
    let user_id = claims.sub;

    let routine =
        with_conn(&pool, move |conn| routines::create_routine(conn, &user_id, fields)).await?;

    Ok(HttpResponse::Created().json(RoutineResponse::from(routine)))
}

/// List all routines owned by the authenticated user
#[get("")]
pub async fn list_routines(pool: web::Data<DbPool>, claims: Claims) -> Result<HttpResponse, ApiError> {
    let user_id = claims.sub;
    let list = with_conn(&pool, move |conn| routines::list_routines(conn, &user_id)).await?;

    let response: Vec<RoutineResponse> = list.into_iter().map(RoutineResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

#[put("/{routine_id}")]
pub async fn update_routine(
    pool: web::Data<DbPool>,
    claims: Claims,
    path: web::Path<String>,
    body: web::Json<RoutineRequest>,
) -> Result<HttpResponse, ApiError> {
    let routine_id = path.into_inner();
    let fields = body.into_inner().into_changeset()?;
    let user_id = claims.sub;

    let routine = with_conn(&pool, move |conn| {
        routines::update_routine(conn, &user_id, &routine_id, &fields)
    })
    .await?;

    Ok(HttpResponse::Ok().json(RoutineResponse::from(routine)))
}

#[delete("/{routine_id}")]
pub async fn delete_routine(
    pool: web::Data<DbPool>,
    claims: Claims,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let routine_id = path.into_inner();
    let user_id = claims.sub;

    with_conn(&pool, move |conn| routines::delete_routine(conn, &user_id, &routine_id)).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({"deleted": true})))
}

// ============================================================================
// Tests
// ============================================================================
