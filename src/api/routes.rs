use actix_web::web;

use super::handlers;
use crate::db::QueryExecutor;

/// Register every report route for a service backed by `E`.
pub fn configure<E: QueryExecutor + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health)).service(
        web::scope("/api")
            .route("/patients", web::get().to(handlers::patients::<E>))
            .route("/service-logs", web::get().to(handlers::service_logs::<E>))
            .route("/statistics", web::get().to(handlers::statistics::<E>))
            .route("/top-clinics", web::get().to(handlers::top_clinics::<E>))
            .route("/hourly", web::get().to(handlers::hourly::<E>))
            .route("/cache/clear", web::post().to(handlers::clear_cache::<E>)),
    );
}
