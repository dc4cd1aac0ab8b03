use actix_web::{HttpResponse, Responder, get, web};

use crate::error::ApiError;

pub mod alarms;
pub mod auth;
pub mod executions;
pub mod insights;
pub mod routines;
pub mod validation;

#[get("/")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "Routine Alarm Backend",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    // Malformed bodies, queries and paths share the validation error shape.
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    );

    cfg.service(health_check);

    // Auth routes (public)
    cfg.service(auth::login);

    // Routine routes (protected)
    cfg.service(
        web::scope("/routines")
            .service(routines::create_routine)
            .service(routines::list_routines)
            .service(routines::update_routine)
            .service(routines::delete_routine),
    );

    // Alarm routes (protected)
    cfg.service(
        web::scope("/alarms")
            .service(alarms::create_alarm)
            .service(alarms::list_alarms)
            .service(alarms::get_alarm)
            .service(alarms::update_alarm)
            .service(alarms::update_alarm_status)
            .service(alarms::replace_repeat_days)
            .service(alarms::delete_alarm),
    );

    // Execution log routes (protected)
    cfg.service(
        web::scope("/alarm-executions")
            .service(executions::record_execution)
            .service(executions::get_execution)
            .service(executions::update_execution),
    );

    // Aggregate views (protected)
    cfg.service(insights::dashboard)
        .service(insights::routine_stats)
        .service(insights::calendar)
        .service(insights::weekly_feedback);
}


#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test as actix_test};

    #[actix_web::test]
    async fn test_health_check_reports_ok() {
        let app = actix_test::init_service(App::new().configure(config)).await;
        let req = actix_test::TestRequest::get().uri("/").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn test_protected_routes_require_token() {
        let (pool, settings, account) = test_utils::app_data();
        let app = actix_test::init_service(
            App::new()
                .app_data(pool)
                .app_data(settings)
                .app_data(account)
                .configure(config),
        )
        .await;

        for uri in [
            "/routines",
            "/alarms",
            "/dashboard",
            "/routine-stats",
            "/weekly-feedback",
            "/calendar?year=2025&month=3",
            "/alarm-executions/e1",
        ] {
            let req = actix_test::TestRequest::get().uri(uri).to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}
