use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use uptime_service::analytics::Period;

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_LOG_LIMIT: usize = 50;

macros_utils::routes! {
    route stats_route,
    route summary_route,
    route logs_route,
    route details_route,
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid monitor id: {raw}")))
}

/// Malformed periods fall back to the route's default window
fn parse_period(raw: Option<&str>, fallback: Period) -> Period {
    match raw.map(str::parse::<Period>) {
        Some(Ok(period)) => period,
        Some(Err(e)) => {
            debug!("Using {} period: {}", fallback, e);
            fallback
        }
        None => fallback,
    }
}

/// Uptime stats and hourly chart data
#[get("/monitors/{id}/stats")]
pub async fn stats_route(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let period = parse_period(query.period.as_deref(), Period::default());

    let report = state.queries.get_stats(id, &period, Utc::now()).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(report))
}

/// Stats plus the latest incidents, weekly by default
#[get("/monitors/{id}/summary")]
pub async fn summary_route(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let period = parse_period(query.period.as_deref(), Period::days(7));

    let summary = state.queries.get_summary(id, &period, Utc::now()).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/monitors/{id}/logs")]
pub async fn logs_route(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);

    let logs = state.queries.recent_activity(id, limit).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(logs))
}

#[get("/monitors/{id}")]
pub async fn details_route(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;

    let details = state.queries.monitor_details(id, Utc::now()).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use chrono::TimeDelta;
    use serde_json::Value;
    use uptime_service::database::Database;
    use uptime_service::database::models::{Monitor, PingLog};
    use uptime_service::monitoring::types::PingStatus;

    async fn seed_logs(database: &dyn Database, monitor: &Monitor, statuses: &[PingStatus]) {
        let now = Utc::now();
        for (i, status) in statuses.iter().enumerate() {
            database
                .append_ping_log(&PingLog {
                    id: None,
                    monitor_id: monitor.id,
                    timestamp: now - TimeDelta::minutes((statuses.len() - i) as i64),
                    status: *status,
                    response_time: status.is_success().then_some(100),
                    status_code: Some(if status.is_success() { 200 } else { 500 }),
                    error_message: None,
                })
                .await
                .unwrap();
        }
    }

    #[actix_web::test]
    async fn test_stats_route() {
        let (_dir, database, state) = test_state().await;
        let monitor = Monitor::new("api", "https://example.com", "ops@example.com");
        database.save_monitor(&monitor).await.unwrap();
        let mut statuses = vec![PingStatus::Success; 7];
        statuses.extend([PingStatus::Failure; 3]);
        seed_logs(database.as_ref(), &monitor, &statuses).await;

        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(routes)).await;
        let req = actix_test::TestRequest::get().uri(&format!("/monitors/{}/stats?period=24h", monitor.id)).to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["stats"]["uptime"], 70.0);
        assert_eq!(body["stats"]["totalPings"], 10);
        assert_eq!(body["stats"]["successfulPings"], 7);
        assert_eq!(body["stats"]["avgResponseTime"], 100);
        assert_eq!(body["stats"]["period"], "24h");
        assert!(body["chartData"].is_array());
    }

    #[actix_web::test]
    async fn test_summary_and_logs_routes() {
        let (_dir, database, state) = test_state().await;
        let monitor = Monitor::new("api", "https://example.com", "ops@example.com");
        database.save_monitor(&monitor).await.unwrap();
        seed_logs(
            database.as_ref(),
            &monitor,
            &[PingStatus::Failure, PingStatus::Failure, PingStatus::Success, PingStatus::Success],
        )
        .await;

        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(routes)).await;

        let req = actix_test::TestRequest::get().uri(&format!("/monitors/{}/summary", monitor.id)).to_request();
        let summary: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(summary["period"], "7d");
        assert_eq!(summary["incidents"].as_array().unwrap().len(), 1);
        assert_eq!(summary["incidents"][0]["ongoing"], false);
        assert_eq!(summary["incidents"][0]["duration"], 120_000);

        let req = actix_test::TestRequest::get().uri(&format!("/monitors/{}/logs?limit=3", monitor.id)).to_request();
        let logs: Value = actix_test::call_and_read_body_json(&app, req).await;
        let logs = logs.as_array().unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0]["status"], "success");
        assert_eq!(logs[2]["status"], "failure");
    }

    #[actix_web::test]
    async fn test_details_route() {
        let (_dir, database, state) = test_state().await;
        let monitor = Monitor::new("api", "https://example.com", "ops@example.com");
        database.save_monitor(&monitor).await.unwrap();
        seed_logs(database.as_ref(), &monitor, &[PingStatus::Success, PingStatus::Failure]).await;

        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(routes)).await;
        let req = actix_test::TestRequest::get().uri(&format!("/monitors/{}", monitor.id)).to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["monitor"]["name"], "api");
        assert_eq!(body["recentLogs"].as_array().unwrap().len(), 2);
        assert_eq!(body["recentLogs"][0]["status"], "failure");
    }

    #[actix_web::test]
    async fn test_unknown_and_malformed_ids() {
        let (_dir, _database, state) = test_state().await;
        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(routes)).await;

        let req = actix_test::TestRequest::get().uri(&format!("/monitors/{}/stats", Uuid::new_v4())).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], "Monitor not found");

        let req = actix_test::TestRequest::get().uri("/monitors/not-a-uuid/logs").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_period_fallback() {
        assert_eq!(parse_period(Some("1h"), Period::default()).label(), "1h");
        assert_eq!(parse_period(Some("soon"), Period::default()).label(), "24h");
        assert_eq!(parse_period(None, Period::days(7)).label(), "7d");
        assert_eq!(parse_period(Some("100000000d"), Period::default()).label(), "24h");
    }

    #[actix_web::test]
    async fn test_oversized_period_falls_back() {
        let (_dir, database, state) = test_state().await;
        let monitor = Monitor::new("api", "https://example.com", "ops@example.com");
        database.save_monitor(&monitor).await.unwrap();
        seed_logs(database.as_ref(), &monitor, &[PingStatus::Success]).await;

        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(routes)).await;
        let req = actix_test::TestRequest::get()
            .uri(&format!("/monitors/{}/stats?period=100000000d", monitor.id))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["stats"]["period"], "24h");
        assert_eq!(body["stats"]["totalPings"], 1);
    }
}
