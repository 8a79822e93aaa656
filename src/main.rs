//! BPJS report backend
//!
//! Main entry point: serves the dashboard's report endpoints.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use bpjs_report::cache::QueryCache;
use bpjs_report::db::Database;
use bpjs_report::report::ReportService;
use bpjs_report::{api, config};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = config::load_config().context("failed to load configuration")?;
    info!(database = ?config.database, cache = ?config.cache, "configuration loaded");

    let service = web::Data::new(ReportService::new(
        Database::new(config.database.clone()),
        QueryCache::from_config(&config.cache),
    ));

    let bind = (config.server.host.clone(), config.server.port);
    info!(host = %bind.0, port = bind.1, "starting report server");

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(TracingLogger::default())
            .configure(api::configure::<Database>)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
