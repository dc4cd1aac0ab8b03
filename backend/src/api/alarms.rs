use crate::{
    api::{
        routines::RoutineResponse,
        validation::{MAX_LABEL_LEN, check_length, check_optional_length},
    },
    db::{DbPool, with_conn},
    error::ApiError,
    models::{AlarmChangeset, AlarmRepeatDay},
    services::{
        alarms::{
            self, AlarmDetail, AlarmSummary, DEFAULT_SOUND_VOLUME, NewAlarm, RoutineLink,
            normalize_weekdays, validate_sound_volume,
        },
        auth::Claims,
        time_format::{format_time_of_day, parse_time_of_day},
    },
};
use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AlarmRoutineLinkDto {
    pub routine_id: String,
    pub order: i32,
}

fn default_status() -> String {
    "Active".to_string()
}

#[derive(Deserialize)]
pub struct CreateAlarmRequest {
    /// `HH:MM`
    pub time: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub sound_volume: Option<f64>,
    #[serde(default)]
    pub repeat_days: Vec<i32>,
    #[serde(default)]
    pub routines: Vec<AlarmRoutineLinkDto>,
}

impl CreateAlarmRequest {
    pub fn into_new_alarm(self) -> Result<NewAlarm, ApiError> {
        check_length("status", &self.status, MAX_LABEL_LEN)?;
        Ok(NewAlarm {
            time: parse_time_of_day(&self.time)?,
            status: self.status,
            sound_volume: validate_sound_volume(self.sound_volume.unwrap_or(DEFAULT_SOUND_VOLUME))?,
            repeat_days: normalize_weekdays(&self.repeat_days)?,
            routines: self
                .routines
                .into_iter()
                .map(|link| RoutineLink {
                    routine_id: link.routine_id,
                    sort_order: link.order,
                })
                .collect(),
        })
    }
}

/// Every field is optional; absent fields are left unchanged.
#[derive(Deserialize)]
pub struct UpdateAlarmRequest {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sound_volume: Option<f64>,
    #[serde(default)]
    pub repeat_days: Option<Vec<i32>>,
}

impl UpdateAlarmRequest {
    pub fn into_parts(self) -> Result<(AlarmChangeset, Option<Vec<i32>>), ApiError> {
        check_optional_length("status", self.status.as_deref(), MAX_LABEL_LEN)?;
        let changes = AlarmChangeset {
            time: self.time.as_deref().map(parse_time_of_day).transpose()?,
            status: self.status,
            sound_volume: self.sound_volume.map(validate_sound_volume).transpose()?,
        };
        let repeat_days = self
            .repeat_days
            .as_deref()
            .map(normalize_weekdays)
            .transpose()?;
        Ok((changes, repeat_days))
    }
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    pub fn into_status(self) -> Result<String, ApiError> {
        check_length("status", &self.status, MAX_LABEL_LEN)?;
        Ok(self.status)
    }
}

#[derive(Deserialize)]
pub struct RepeatDaysRequest {
    pub repeat_days: Vec<i32>,
}

#[derive(Serialize)]
pub struct AlarmDetailResponse {
    pub alarm_id: String,
    pub user_id: String,
    pub time: String,
    pub status: String,
    pub sound_volume: f64,
    pub repeat_days: Vec<i32>,
    pub routines: Vec<RoutineResponse>,
}

impl From<AlarmDetail> for AlarmDetailResponse {
    fn from(detail: AlarmDetail) -> Self {
        Self {
            time: format_time_of_day(&detail.alarm.time),
            alarm_id: detail.alarm.alarm_id,
            user_id: detail.alarm.user_id,
            status: detail.alarm.status,
            sound_volume: detail.alarm.sound_volume,
            repeat_days: detail.repeat_days,
            routines: detail.routines.into_iter().map(RoutineResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct AlarmSummaryResponse {
    pub alarm_id: String,
    pub time: String,
    pub status: String,
    pub sound_volume: f64,
    pub repeat_days: Vec<i32>,
    pub routines: Vec<AlarmRoutineLinkDto>,
}

impl From<AlarmSummary> for AlarmSummaryResponse {
    fn from(summary: AlarmSummary) -> Self {
        Self {
            time: format_time_of_day(&summary.alarm.time),
            alarm_id: summary.alarm.alarm_id,
            status: summary.alarm.status,
            sound_volume: summary.alarm.sound_volume,
            repeat_days: summary.repeat_days,
            routines: summary
                .links
                .into_iter()
                .map(|link| AlarmRoutineLinkDto {
                    routine_id: link.routine_id,
                    order: link.sort_order,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
pub struct RepeatDayResponse {
    pub alarm_id: String,
    pub weekday: i32,
}

impl From<AlarmRepeatDay> for RepeatDayResponse {
    fn from(day: AlarmRepeatDay) -> Self {
        Self {
            alarm_id: day.alarm_id,
            weekday: day.weekday,
        }
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Create an alarm together with its routine links and repeat days
#[post("")]
pub async fn create_alarm(
    pool: web::Data<DbPool>,
    claims: Claims,
    body: web::Json<CreateAlarmRequest>,
) -> Result<HttpResponse, ApiError> {
    let input = body.into_inner().into_new_alarm()?;
    let user_id = claims.sub;

    let detail = with_conn(&pool, move |conn| alarms::create_alarm(conn, &user_id, input)).await?;

    Ok(HttpResponse::Created().json(AlarmDetailResponse::from(detail)))
}

#[get("")]
pub async fn list_alarms(pool: web::Data<DbPool>, claims: Claims) -> Result<HttpResponse, ApiError> {
    let user_id = claims.sub;
    let list = with_conn(&pool, move |conn| alarms::list_alarms(conn, &user_id)).await?;

    let response: Vec<AlarmSummaryResponse> =
        list.into_iter().map(AlarmSummaryResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

#[get("/{alarm_id}")]
pub async fn get_alarm(
    pool: web::Data<DbPool>,
    claims: Claims,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let alarm_id = path.into_inner();
    let user_id = claims.sub;

    let detail = with_conn(&pool, move |conn| alarms::get_alarm(conn, &user_id, &alarm_id)).await?;

    Ok(HttpResponse::Ok().json(AlarmDetailResponse::from(detail)))
}

#[put("/{alarm_id}")]
pub async fn update_alarm(
    pool: web::Data<DbPool>,
    claims: Claims,
    path: web::Path<String>,
    body: web::Json<UpdateAlarmRequest>,
) -> Result<HttpResponse, ApiError> {
    let alarm_id = path.into_inner();
    let (changes, repeat_days) = body.into_inner().into_parts()?;
    let user_id = claims.sub;

    let detail = with_conn(&pool, move |conn| {
        alarms::update_alarm(conn, &user_id, &alarm_id, changes, repeat_days)
    })
    .await?;

    Ok(HttpResponse::Ok().json(AlarmDetailResponse::from(detail)))
}

#[patch("/{alarm_id}/status")]
pub async fn update_alarm_status(
    pool: web::Data<DbPool>,
    claims: Claims,
    path: web::Path<String>,
    body: web::Json<StatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let alarm_id = path.into_inner();
    let status = body.into_inner().into_status()?;
    let user_id = claims.sub;

    let updated = with_conn(&pool, move |conn| {
        alarms::update_alarm_status(conn, &user_id, &alarm_id, &status)
    })
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "alarm_id": updated.alarm_id,
        "status": updated.status
    })))
}

/// Replace the alarm's repeat days with exactly the submitted set
#[post("/{alarm_id}/repeat-days")]
pub async fn replace_repeat_days(
    pool: web::Data<DbPool>,
    claims: Claims,
    path: web::Path<String>,
    body: web::Json<RepeatDaysRequest>,
) -> Result<HttpResponse, ApiError> {
    let alarm_id = path.into_inner();
    let days = normalize_weekdays(&body.repeat_days)?;
    let user_id = claims.sub;

    let rows = with_conn(&pool, move |conn| {
        alarms::replace_repeat_days(conn, &user_id, &alarm_id, &days)
    })
    .await?;

    let response: Vec<RepeatDayResponse> = rows.into_iter().map(RepeatDayResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// Delete an alarm with its routine links and repeat days
#[delete("/{alarm_id}")]
pub async fn delete_alarm(
    pool: web::Data<DbPool>,
    claims: Claims,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let alarm_id = path.into_inner();
    let user_id = claims.sub;

    with_conn(&pool, move |conn| alarms::delete_alarm(conn, &user_id, &alarm_id)).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({"deleted": true})))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{config, test_utils};
    use crate::models::{Alarm, Routine};
    use actix_web::{App, http::StatusCode, test as actix_test};
    use chrono::NaiveTime;

    #[test]
    fn test_create_alarm_request_defaults() {
        let json = r#"{"time": "07:30"}"#;
        let request: CreateAlarmRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.status, "Active");

        let alarm = request.into_new_alarm().unwrap();
        assert_eq!(alarm.time, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(alarm.sound_volume, DEFAULT_SOUND_VOLUME);
        assert!(alarm.repeat_days.is_empty());
        assert!(alarm.routines.is_empty());
    }

    #[test]
    fn test_create_alarm_request_with_links_and_days() {
        let json = r#"{
            "time": "07:30",
            "status": "Active",
            "sound_volume": 0.5,
            "vibration_on": true,
            "repeat_days": [5, 1, 3],
            "routines": [{"routine_id": "r1", "order": 1}]
        }"#;
        let request: CreateAlarmRequest = serde_json::from_str(json).unwrap();
        let alarm = request.into_new_alarm().unwrap();

        assert_eq!(alarm.repeat_days, vec![1, 3, 5]);
        assert_eq!(
            alarm.routines,
            vec![RoutineLink {
                routine_id: "r1".to_string(),
                sort_order: 1
            }]
        );
    }

    #[test]
    fn test_create_alarm_request_rejects_invalid_input() {
        let bad_time: CreateAlarmRequest = serde_json::from_str(r#"{"time": "7.30"}"#).unwrap();
        assert!(bad_time.into_new_alarm().is_err());

        let bad_day: CreateAlarmRequest =
            serde_json::from_str(r#"{"time": "07:30", "repeat_days": [0]}"#).unwrap();
        assert!(bad_day.into_new_alarm().is_err());

        let loud: CreateAlarmRequest =
            serde_json::from_str(r#"{"time": "07:30", "sound_volume": 1.5}"#).unwrap();
        assert!(loud.into_new_alarm().is_err());
    }

    #[test]
    fn test_update_alarm_request_partial() {
        let request: UpdateAlarmRequest = serde_json::from_str(r#"{"status": "Inactive"}"#).unwrap();
        let (changes, repeat_days) = request.into_parts().unwrap();

        assert_eq!(changes.status.as_deref(), Some("Inactive"));
        assert!(changes.time.is_none());
        assert!(changes.sound_volume.is_none());
        assert!(repeat_days.is_none());
    }

    #[test]
    fn test_update_alarm_request_empty_days_clears() {
        let request: UpdateAlarmRequest = serde_json::from_str(r#"{"repeat_days": []}"#).unwrap();
        let (changes, repeat_days) = request.into_parts().unwrap();

        assert!(changes.is_empty());
        assert_eq!(repeat_days, Some(vec![]));
    }

    #[test]
    fn test_alarm_detail_response_shape() {
        let detail = AlarmDetail {
            alarm: Alarm {
                alarm_id: "a1".to_string(),
                user_id: "u1".to_string(),
                time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
                sound_volume: 0.8,
                status: "Active".to_string(),
            },
            repeat_days: vec![1, 3, 5],
            routines: vec![Routine {
                routine_id: "r1".to_string(),
                user_id: "u1".to_string(),
                title: "Push-ups".to_string(),
                routine_type: "count".to_string(),
                goal_value: Some(30),
                duration_seconds: None,
                deadline_time: None,
                success_note: None,
            }],
        };
        let json = serde_json::to_value(AlarmDetailResponse::from(detail)).unwrap();

        assert_eq!(json["time"], "07:30");
        assert_eq!(json["repeat_days"], serde_json::json!([1, 3, 5]));
        assert_eq!(json["routines"][0]["routine_id"], "r1");
        assert_eq!(json["routines"][0]["title"], "Push-ups");
    }

    #[test]
    fn test_alarm_summary_response_uses_order_key() {
        let summary = AlarmSummary {
            alarm: Alarm {
                alarm_id: "a1".to_string(),
                user_id: "u1".to_string(),
                time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                sound_volume: 0.3,
                status: "Active".to_string(),
            },
            repeat_days: vec![],
            links: vec![RoutineLink {
                routine_id: "r2".to_string(),
                sort_order: 2,
            }],
        };
        let json = serde_json::to_value(AlarmSummaryResponse::from(summary)).unwrap();

        assert_eq!(
            json["routines"],
            serde_json::json!([{"routine_id": "r2", "order": 2}])
        );
        assert!(json.get("user_id").is_none());
    }

    #[actix_web::test]
    async fn test_replace_repeat_days_rejects_out_of_range_weekday() {
        let (pool, settings, account) = test_utils::app_data();
        let app = actix_test::init_service(
            App::new()
                .app_data(pool)
                .app_data(settings)
                .app_data(account)
                .configure(config),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/alarms/a1/repeat-days")
            .insert_header(test_utils::bearer("u1"))
            .set_json(serde_json::json!({"repeat_days": [1, 9]}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_update_alarm_request_normalizes_once() {
        let request: UpdateAlarmRequest =
            serde_json::from_str(r#"{"sound_volume": 0.456, "repeat_days": [3, 1, 3]}"#).unwrap();
        let (changes, repeat_days) = request.into_parts().unwrap();
        assert_eq!(changes.sound_volume, Some(0.46));
        assert!(changes.time.is_none());
        assert_eq!(repeat_days, Some(vec![1, 3]));

        let request: UpdateAlarmRequest =
            serde_json::from_str(r#"{"sound_volume": 1.5}"#).unwrap();
        assert!(matches!(request.into_parts(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_alarm_status_length_is_bounded() {
        let create: CreateAlarmRequest =
            serde_json::from_str(r#"{"time": "07:30", "status": "ActiveButOnlyOnWeekdays"}"#)
                .unwrap();
        assert!(matches!(create.into_new_alarm(), Err(ApiError::Validation(_))));

        let update: UpdateAlarmRequest =
            serde_json::from_str(r#"{"status": "ActiveButOnlyOnWeekdays"}"#).unwrap();
        assert!(matches!(update.into_parts(), Err(ApiError::Validation(_))));

        let status: StatusRequest = serde_json::from_str(r#"{"status": "Inactive"}"#).unwrap();
        assert_eq!(status.into_status().unwrap(), "Inactive");
    }

    #[actix_web::test]
    async fn test_overlong_status_is_bad_request() {
        let (pool, settings, account) = test_utils::app_data();
        let app = actix_test::init_service(
            App::new()
                .app_data(pool)
                .app_data(settings)
                .app_data(account)
                .configure(config),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/alarms")
            .insert_header(test_utils::bearer("u1"))
            .set_json(serde_json::json!({"time": "07:30", "status": "ActiveButOnlyOnWeekdays"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::patch()
            .uri("/alarms/a1/status")
            .insert_header(test_utils::bearer("u1"))
            .set_json(serde_json::json!({"status": "ActiveButOnlyOnWeekdays"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_create_alarm_with_bad_time_is_bad_request() {
        let (pool, settings, account) = test_utils::app_data();
        let app = actix_test::init_service(
            App::new()
                .app_data(pool)
                .app_data(settings)
                .app_data(account)
                .configure(config),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/alarms")
            .insert_header(test_utils::bearer("u1"))
            .set_json(serde_json::json!({"time": "seven", "status": "Active"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
