//! Domain queries behind the BPJS registration dashboard.
//!
//! [`ReportService`] holds an executor and a [`QueryCache`]; every entry
//! point takes a `YYYY-MM-DD` date range (inclusive on both ends, passed
//! through unvalidated) and returns a [`ReportOutcome`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::cache::{CacheKey, QueryCache};
use crate::db::{QueryExecutor, SqlParam};
use crate::models::Table;

pub mod queries;
pub mod time_format;

pub use time_format::format_time_field;

/// Result of a report call.
///
/// `Empty` means the query ran and matched nothing; `Failed` means no data
/// could be retrieved at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ReportOutcome {
    Data(Arc<Table>),
    Empty,
    Failed(String),
}

impl ReportOutcome {
    pub fn from_table(table: Table) -> Self {
        if table.is_empty() {
            ReportOutcome::Empty
        } else {
            ReportOutcome::Data(Arc::new(table))
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match self {
            ReportOutcome::Data(table) => Some(table),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ReportOutcome::Empty)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ReportOutcome::Failed(_))
    }
}

pub struct ReportService<E> {
    executor: E,
    cache: QueryCache,
}

impl<E: QueryExecutor> ReportService<E> {
    pub fn new(executor: E, cache: QueryCache) -> Self {
        Self { executor, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Forget every cached report.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("report cache cleared");
    }

    /// Outpatient BPJS registrations with their referral data, ordered by visit.
    #[instrument(skip(self))]
    pub async fn load_patient_data(&self, start_date: &str, end_date: &str) -> ReportOutcome {
        let key = CacheKey::new("load_patient_data", [start_date, end_date]);
        self.cache
            .get_or_compute(key, move || async move {
                info!("loading patient registrations");
                let params = [start_date, end_date, start_date, end_date].map(SqlParam::from);
                self.run(queries::PATIENT_REGISTRATIONS, &params, format_time_field)
                    .await
            })
            .await
    }

    /// Query-log rows created in the range, newest first.
    #[instrument(skip(self))]
    pub async fn load_service_logs(&self, start_date: &str, end_date: &str) -> ReportOutcome {
        let key = CacheKey::new("load_service_logs", [start_date, end_date]);
        self.cache
            .get_or_compute(key, move || async move {
                info!("loading service logs");
                let params = [start_date, end_date].map(SqlParam::from);
                self.run(queries::SERVICE_LOGS, &params, |_| {}).await
            })
            .await
    }

    /// Visit, patient, clinic and doctor counts for the range.
    #[instrument(skip(self))]
    pub async fn visit_statistics(&self, start_date: &str, end_date: &str) -> ReportOutcome {
        let key = CacheKey::new("visit_statistics", [start_date, end_date]);
        self.cache
            .get_or_compute(key, move || async move {
                info!("loading visit statistics");
                let params = [start_date, end_date].map(SqlParam::from);
                self.run(queries::VISIT_STATISTICS, &params, |_| {}).await
            })
            .await
    }

    /// The `limit` busiest clinics in the range.
    #[instrument(skip(self))]
    pub async fn top_clinics(&self, start_date: &str, end_date: &str, limit: u32) -> ReportOutcome {
        let limit_arg = limit.to_string();
        let key = CacheKey::new("top_clinics", [start_date, end_date, limit_arg.as_str()]);
        self.cache
            .get_or_compute(key, move || async move {
                info!("loading clinic ranking");
                let params = [
                    SqlParam::from(start_date),
                    SqlParam::from(end_date),
                    SqlParam::Int(i64::from(limit)),
                ];
                self.run(queries::TOP_CLINICS, &params, |_| {}).await
            })
            .await
    }

    /// Visits per registration hour.
    #[instrument(skip(self))]
    pub async fn hourly_distribution(&self, start_date: &str, end_date: &str) -> ReportOutcome {
        let key = CacheKey::new("hourly_distribution", [start_date, end_date]);
        self.cache
            .get_or_compute(key, move || async move {
                info!("loading hourly distribution");
                let params = [start_date, end_date].map(SqlParam::from);
                self.run(queries::HOURLY_DISTRIBUTION, &params, |_| {}).await
            })
            .await
    }

    /// Execute `sql`, post-process a non-empty result and tag the outcome.
    async fn run<F>(&self, sql: &str, params: &[SqlParam], post_process: F) -> ReportOutcome
    where
        F: FnOnce(&mut Table),
    {
        match self.executor.execute_query(sql, params).await {
            Ok(mut table) => {
                if !table.is_empty() {
                    post_process(&mut table);
                }
                ReportOutcome::from_table(table)
            }
            Err(err) => {
                error!(error = %err, "report query failed");
                ReportOutcome::Failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::MockQueryExecutor;
    use crate::error::QueryError;
    use crate::models::Value;

    fn registrations() -> Table {
        Table::from_rows(
            &["no_rawat", "jam_reg", "kd_poli"],
            vec![
                vec!["2024/01/01/000001".into(), "9:30".into(), "INT".into()],
                vec!["2024/01/01/000002".into(), Duration::seconds(5400).into(), "MAT".into()],
            ],
        )
    }

    fn service(executor: MockQueryExecutor) -> ReportService<MockQueryExecutor> {
        ReportService::new(executor, QueryCache::unbounded())
    }

    #[tokio::test]
    async fn patient_data_binds_the_range_twice_and_formats_times() {
        let mut executor = MockQueryExecutor::new();
        executor
            .expect_execute_query()
            .withf(|sql, params| {
                sql == queries::PATIENT_REGISTRATIONS
                    && params
                        == [
                            SqlParam::from("2024-01-01"),
                            SqlParam::from("2024-01-31"),
                            SqlParam::from("2024-01-01"),
                            SqlParam::from("2024-01-31"),
                        ]
            })
            .times(1)
            .returning(|_, _| Ok(registrations()));

        let outcome = service(executor)
            .load_patient_data("2024-01-01", "2024-01-31")
            .await;

        let table = outcome.table().expect("rows");
        assert_eq!(
            table.column("jam_reg").unwrap(),
            vec![&Value::from("09:30:00"), &Value::from("01:30:00")]
        );
    }

    #[tokio::test]
    async fn identical_ranges_hit_the_database_once() {
        let mut executor = MockQueryExecutor::new();
        executor
            .expect_execute_query()
            .times(1)
            .returning(|_, _| Ok(registrations()));
        let service = service(executor);

        let first = service.load_patient_data("2024-01-01", "2024-01-31").await;
        let second = service.load_patient_data("2024-01-01", "2024-01-31").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn different_ranges_are_cached_separately() {
        let mut executor = MockQueryExecutor::new();
        executor
            .expect_execute_query()
            .times(2)
            .returning(|_, _| Ok(Table::default()));
        let service = service(executor);

        service.load_service_logs("2024-01-01", "2024-01-31").await;
        service.load_service_logs("2024-02-01", "2024-02-29").await;
        service.load_service_logs("2024-01-01", "2024-01-31").await;
        assert_eq!(service.cache().len(), 2);
    }

    #[tokio::test]
    async fn no_rows_is_empty_not_failed() {
        let mut executor = MockQueryExecutor::new();
        executor
            .expect_execute_query()
            .returning(|_, _| Ok(Table::default()));

        let outcome = service(executor)
            .load_service_logs("2024-01-01", "2024-01-01")
            .await;
        assert!(outcome.is_empty());
        assert!(!outcome.is_failed());
    }

    #[tokio::test]
    async fn query_errors_become_failed_outcomes_and_are_retried() {
        let mut executor = MockQueryExecutor::new();
        executor
            .expect_execute_query()
            .times(2)
            .returning(|_, _| Err(QueryError::Execution(sqlx::Error::RowNotFound)));
        let service = service(executor);

        for _ in 0..2 {
            let outcome = service.load_patient_data("2024-01-01", "2024-01-31").await;
            match outcome {
                ReportOutcome::Failed(message) => assert!(message.contains("query failed")),
                other => panic!("expected failure, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn service_logs_are_not_post_processed() {
        let logs = Table::from_rows(&["jam_reg"], vec![vec!["9:30".into()]]);
        let mut executor = MockQueryExecutor::new();
        executor
            .expect_execute_query()
            .withf(|sql, _| sql == queries::SERVICE_LOGS)
            .returning(move |_, _| Ok(logs.clone()));

        let outcome = service(executor)
            .load_service_logs("2024-01-01", "2024-01-31")
            .await;
        assert_eq!(outcome.table().unwrap().get(0, "jam_reg"), Some(&Value::from("9:30")));
    }

    #[tokio::test]
    async fn top_clinics_binds_limit_as_integer_and_keys_on_it() {
        let mut executor = MockQueryExecutor::new();
        executor
            .expect_execute_query()
            .withf(|sql, params| {
                sql == queries::TOP_CLINICS && params.last() == Some(&SqlParam::Int(5))
            })
            .times(1)
            .returning(|_, _| Ok(Table::default()));
        executor
            .expect_execute_query()
            .withf(|_, params| params.last() == Some(&SqlParam::Int(10)))
            .times(1)
            .returning(|_, _| Ok(Table::default()));
        let service = service(executor);

        service.top_clinics("2024-01-01", "2024-01-31", 5).await;
        service.top_clinics("2024-01-01", "2024-01-31", 5).await;
        service.top_clinics("2024-01-01", "2024-01-31", 10).await;
    }

    #[tokio::test]
    async fn statistics_and_hourly_use_their_own_queries() {
        let mut executor = MockQueryExecutor::new();
        executor
            .expect_execute_query()
            .withf(|sql, _| sql == queries::VISIT_STATISTICS)
            .times(1)
            .returning(|_, _| Ok(Table::default()));
        executor
            .expect_execute_query()
            .withf(|sql, _| sql == queries::HOURLY_DISTRIBUTION)
            .times(1)
            .returning(|_, _| Ok(Table::default()));
        let service = service(executor);

        assert!(service.visit_statistics("2024-01-01", "2024-01-31").await.is_empty());
        assert!(service.hourly_distribution("2024-01-01", "2024-01-31").await.is_empty());
    }

    #[test]
    fn outcome_serialises_with_status_tag() {
        let json = serde_json::to_value(ReportOutcome::Failed("boom".into())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failed", "data": "boom"}));
        let json = serde_json::to_value(ReportOutcome::Empty).unwrap();
        assert_eq!(json, serde_json::json!({"status": "empty"}));
    }
}
