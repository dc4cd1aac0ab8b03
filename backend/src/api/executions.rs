use crate::{
    api::validation::{MAX_TIMESTAMP_LEN, check_optional_length},
    db::{DbPool, with_conn},
    error::ApiError,
    models::AlarmExecutionRoutine,
    services::{
        auth::Claims,
        executions::{self, ExecutionDetail, NewExecution, OutcomePatch, RoutineOutcome},
    },
};
use actix_web::{HttpResponse, get, post, put, web};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Deserialize)]
pub struct ExecutionRoutineRequest {
    pub routine_id: String,
    pub completed: bool,
    #[serde(default)]
    pub actual_value: Option<i32>,
    #[serde(default)]
    pub completed_ts: Option<String>,
    #[serde(default)]
    pub abort_ts: Option<String>,
    pub order: i32,
}

#[derive(Deserialize)]
pub struct CreateExecutionRequest {
    pub alarm_id: String,
    #[serde(default)]
    pub scheduled_ts: Option<String>,
    #[serde(default)]
    pub dismissed_ts: Option<String>,
    pub routines: Vec<ExecutionRoutineRequest>,
}

/// Timestamps are stored verbatim, so only their width is checked.
fn check_timestamps(completed_ts: Option<&str>, abort_ts: Option<&str>) -> Result<(), ApiError> {
    check_optional_length("completed_ts", completed_ts, MAX_TIMESTAMP_LEN)?;
    check_optional_length("abort_ts", abort_ts, MAX_TIMESTAMP_LEN)
}

impl CreateExecutionRequest {
    pub fn into_new_execution(self) -> Result<NewExecution, ApiError> {
        check_optional_length("scheduled_ts", self.scheduled_ts.as_deref(), MAX_TIMESTAMP_LEN)?;
        check_optional_length("dismissed_ts", self.dismissed_ts.as_deref(), MAX_TIMESTAMP_LEN)?;

        let routines = self
            .routines
            .into_iter()
            .map(|r| {
                check_timestamps(r.completed_ts.as_deref(), r.abort_ts.as_deref())?;
                Ok(RoutineOutcome {
                    routine_id: r.routine_id,
                    completed: r.completed,
                    actual_value: r.actual_value,
                    completed_ts: r.completed_ts,
                    abort_ts: r.abort_ts,
                    sort_order: r.order,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(NewExecution {
            alarm_id: self.alarm_id,
            scheduled_ts: self.scheduled_ts,
            dismissed_ts: self.dismissed_ts,
            routines,
        })
    }
}

#[derive(Deserialize)]
pub struct OutcomePatchRequest {
    pub routine_id: String,
    pub completed: bool,
    #[serde(default)]
    pub actual_value: Option<i32>,
    #[serde(default)]
    pub completed_ts: Option<String>,
    #[serde(default)]
    pub abort_ts: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateExecutionRequest {
    pub routines: Vec<OutcomePatchRequest>,
}

impl UpdateExecutionRequest {
    pub fn into_patches(self) -> Result<Vec<OutcomePatch>, ApiError> {
        self.routines
            .into_iter()
            .map(|p| {
                check_timestamps(p.completed_ts.as_deref(), p.abort_ts.as_deref())?;
                Ok(OutcomePatch {
                    routine_id: p.routine_id,
                    completed: p.completed,
                    actual_value: p.actual_value,
                    completed_ts: p.completed_ts,
                    abort_ts: p.abort_ts,
                })
            })
            .collect()
    }
}

#[derive(Serialize)]
pub struct ExecutionRoutineResponse {
    pub axr_id: String,
    pub routine_id: String,
    pub completed: bool,
    pub actual_value: Option<i32>,
    pub completed_ts: Option<String>,
    pub abort_ts: Option<String>,
    pub order: i32,
}

impl From<AlarmExecutionRoutine> for ExecutionRoutineResponse {
    fn from(row: AlarmExecutionRoutine) -> Self {
        Self {
            axr_id: row.axr_id,
            routine_id: row.routine_id,
            completed: row.completed != 0,
            actual_value: row.actual_value,
            completed_ts: row.completed_ts,
            abort_ts: row.abort_ts,
            order: row.sort_order,
        }
    }
}

#[derive(Serialize)]
pub struct ExecutionResponse {
    pub exec_id: String,
    pub alarm_id: String,
    pub scheduled_ts: Option<String>,
    pub dismissed_ts: Option<String>,
    pub total_routines: i32,
    pub completed_routines: i32,
    pub success_rate: f64,
    pub status: String,
    pub routines: Vec<ExecutionRoutineResponse>,
}

impl From<ExecutionDetail> for ExecutionResponse {
    fn from(detail: ExecutionDetail) -> Self {
        let log = detail.log;
        Self {
            exec_id: log.exec_id,
            alarm_id: log.alarm_id,
            scheduled_ts: log.scheduled_ts,
            dismissed_ts: log.dismissed_ts,
            total_routines: log.total_routines,
            completed_routines: log.completed_routines,
            success_rate: log.success_rate,
            status: log.status,
            routines: detail
                .routines
                .into_iter()
                .map(ExecutionRoutineResponse::from)
                .collect(),
        }
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Record the outcome of one alarm firing
#[post("")]
pub async fn record_execution(
    pool: web::Data<DbPool>,
    claims: Claims,
    body: web::Json<CreateExecutionRequest>,
) -> Result<HttpResponse, ApiError> {
    let input = body.into_inner().into_new_execution()?;
    let user_id = claims.sub;

    let exec_id =
        with_conn(&pool, move |conn| executions::record_execution(conn, &user_id, input)).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Execution saved",
        "exec_id": exec_id
    })))
}

#[get("/{exec_id}")]
pub async fn get_execution(
    pool: web::Data<DbPool>,
    claims: Claims,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let exec_id = path.into_inner();
    let user_id = claims.sub;

    let detail =
        with_conn(&pool, move |conn| executions::get_execution(conn, &user_id, &exec_id)).await?;

    Ok(HttpResponse::Ok().json(ExecutionResponse::from(detail)))
}

/// Correct routine outcomes of an execution and recompute its totals
#[put("/{exec_id}")]
pub async fn update_execution(
    pool: web::Data<DbPool>,
    claims: Claims,
    path: web::Path<String>,
    body: web::Json<UpdateExecutionRequest>,
) -> Result<HttpResponse, ApiError> {
    let exec_id = path.into_inner();
    let patches = body.into_inner().into_patches()?;
    let user_id = claims.sub;

    let detail = with_conn(&pool, move |conn| {
        executions::update_execution(conn, &user_id, &exec_id, &patches)
    })
    .await?;

    Ok(HttpResponse::Ok().json(ExecutionResponse::from(detail)))
}

// ============================================================================
// Tests
// ============================================================================
