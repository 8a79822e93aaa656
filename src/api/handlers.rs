use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::db::QueryExecutor;
use crate::models::{ClinicVisits, HourlyVisits, Table, VisitStatistics};
use crate::report::{ReportOutcome, ReportService};

const DEFAULT_TOP_CLINICS: u32 = 10;
const INCOMPLETE_STATISTICS: &str = "statistics row is missing a count";

/// `?start_date=YYYY-MM-DD&end_date=YYYY-MM-DD`, both inclusive.
#[derive(Debug, Deserialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct TopClinicsQuery {
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_TOP_CLINICS
}

/// Serialise an outcome as is. Failures answer 502.
fn respond(outcome: ReportOutcome) -> HttpResponse {
    if outcome.is_failed() {
        HttpResponse::BadGateway().json(&outcome)
    } else {
        HttpResponse::Ok().json(&outcome)
    }
}

/// Like [`respond`], but render successful rows through a typed view.
fn respond_with<T, F>(outcome: ReportOutcome, view: F) -> HttpResponse
where
    T: Serialize,
    F: FnOnce(&Table) -> T,
{
    match outcome {
        ReportOutcome::Data(table) => {
            HttpResponse::Ok().json(json!({ "status": "data", "data": view(table.as_ref()) }))
        }
        other => respond(other),
    }
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn patients<E: QueryExecutor + 'static>(
    service: web::Data<ReportService<E>>,
    range: web::Query<DateRange>,
) -> HttpResponse {
    respond(service.load_patient_data(&range.start_date, &range.end_date).await)
}

pub async fn service_logs<E: QueryExecutor + 'static>(
    service: web::Data<ReportService<E>>,
    range: web::Query<DateRange>,
) -> HttpResponse {
    respond(service.load_service_logs(&range.start_date, &range.end_date).await)
}

pub async fn statistics<E: QueryExecutor + 'static>(
    service: web::Data<ReportService<E>>,
    range: web::Query<DateRange>,
) -> HttpResponse {
    let outcome = service.visit_statistics(&range.start_date, &range.end_date).await;
    match outcome {
        ReportOutcome::Data(table) => match VisitStatistics::from_table(&table) {
            Some(stats) => HttpResponse::Ok().json(json!({ "status": "data", "data": stats })),
            None => {
                warn!(columns = ?table.columns(), "incomplete statistics row");
                respond(ReportOutcome::Failed(INCOMPLETE_STATISTICS.to_string()))
            }
        },
        other => respond(other),
    }
}

pub async fn top_clinics<E: QueryExecutor + 'static>(
    service: web::Data<ReportService<E>>,
    query: web::Query<TopClinicsQuery>,
) -> HttpResponse {
    let outcome = service
        .top_clinics(&query.start_date, &query.end_date, query.limit)
        .await;
    respond_with(outcome, ClinicVisits::from_table)
}

pub async fn hourly<E: QueryExecutor + 'static>(
    service: web::Data<ReportService<E>>,
    range: web::Query<DateRange>,
) -> HttpResponse {
    let outcome = service
        .hourly_distribution(&range.start_date, &range.end_date)
        .await;
    respond_with(outcome, HourlyVisits::from_table)
}

pub async fn clear_cache<E: QueryExecutor + 'static>(
    service: web::Data<ReportService<E>>,
) -> HttpResponse {
    service.clear_cache();
    HttpResponse::NoContent().finish()
}
