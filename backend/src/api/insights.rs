use crate::{
    api::{alarms::AlarmDetailResponse, routines::RoutineResponse},
    db::{DbPool, with_conn},
    error::ApiError,
    services::{alarms, auth::Claims, insights, routines},
};
use actix_web::{HttpResponse, get, web};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct DashboardResponse {
    pub alarms: Vec<AlarmDetailResponse>,
    pub routines: Vec<RoutineResponse>,
}

#[derive(Deserialize)]
pub struct CalendarQuery {
    pub year: i32,
    pub month: u32,
}

/// Every alarm with its routines plus the full routine list
#[get("/dashboard")]
pub async fn dashboard(pool: web::Data<DbPool>, claims: Claims) -> Result<HttpResponse, ApiError> {
    let user_id = claims.sub;

    let (alarm_list, routine_list) = with_conn(&pool, move |conn| {
        let alarm_list = alarms::list_alarm_details(conn, &user_id)?;
        let routine_list = routines::list_routines(conn, &user_id)?;
        Ok((alarm_list, routine_list))
    })
    .await?;

    Ok(HttpResponse::Ok().json(DashboardResponse {
        alarms: alarm_list.into_iter().map(AlarmDetailResponse::from).collect(),
        routines: routine_list.into_iter().map(RoutineResponse::from).collect(),
    }))
}

#[get("/routine-stats")]
pub async fn routine_stats(
    pool: web::Data<DbPool>,
    claims: Claims,
) -> Result<HttpResponse, ApiError> {
    let user_id = claims.sub;
    let stats = with_conn(&pool, move |conn| insights::routine_stats(conn, &user_id)).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Daily average success rate for one month
#[get("/calendar")]
pub async fn calendar(
    pool: web::Data<DbPool>,
    claims: Claims,
    query: web::Query<CalendarQuery>,
) -> Result<HttpResponse, ApiError> {
    let CalendarQuery { year, month } = query.into_inner();
    insights::check_month(month)?;
    let user_id = claims.sub;

    let days =
        with_conn(&pool, move |conn| insights::calendar(conn, &user_id, year, month)).await?;
    Ok(HttpResponse::Ok().json(days))
}

/// Completion summary of the four most recent ISO weeks
#[get("/weekly-feedback")]
pub async fn weekly_feedback(
    pool: web::Data<DbPool>,
    claims: Claims,
) -> Result<HttpResponse, ApiError> {
    let user_id = claims.sub;
    let weeks = with_conn(&pool, move |conn| insights::weekly_feedback(conn, &user_id)).await?;
    Ok(HttpResponse::Ok().json(weeks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{config, test_utils};
    use actix_web::{App, http::StatusCode, test as actix_test};

    #[test]
    fn test_calendar_query_deserialization() {
        let query: CalendarQuery = serde_json::from_str(r#"{"year": 2025, "month": 3}"#).unwrap();
        assert_eq!(query.year, 2025);
        assert_eq!(query.month, 3);
    }

    #[actix_web::test]
    async fn test_calendar_rejects_invalid_month() {
        let (pool, settings, account) = test_utils::app_data();
        let app = actix_test::init_service(
            App::new()
                .app_data(pool)
                .app_data(settings)
                .app_data(account)
                .configure(config),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/calendar?year=2025&month=13")
            .insert_header(test_utils::bearer("u1"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_calendar_requires_year_and_month() {
        let (pool, settings, account) = test_utils::app_data();
        let app = actix_test::init_service(
            App::new()
                .app_data(pool)
                .app_data(settings)
                .app_data(account)
                .configure(config),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/calendar?year=2025")
            .insert_header(test_utils::bearer("u1"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
