//! Database module for the BPJS report backend
//!
//! This module owns raw MySQL access. Every query opens its own connection,
//! fetches the full result set into a [`Table`] and closes the connection
//! again, whether the query succeeded or not. There is no pool.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{ConnectOptions, Connection, Executor};
use tracing::{debug, error, instrument, warn};

use crate::config::DatabaseConfig;
use crate::error::QueryError;
use crate::models::Table;

mod decode;

use decode::Protocol;

/// Positional bind parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        SqlParam::Text(s.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        SqlParam::Text(s)
    }
}

impl From<i64> for SqlParam {
    fn from(n: i64) -> Self {
        SqlParam::Int(n)
    }
}

/// Runs a SQL statement and materialises every row.
///
/// Parameters are always bound through the driver, never interpolated.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute_query(&self, sql: &str, params: &[SqlParam]) -> Result<Table, QueryError>;
}

/// MySQL-backed executor.
pub struct Database {
    config: DatabaseConfig,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.database)
            .disable_statement_logging()
    }

    /// Open a fresh connection. No retry.
    #[instrument(skip(self), fields(host = %self.config.host, port = self.config.port))]
    pub async fn connect(&self) -> Result<MySqlConnection, QueryError> {
        self.connect_options().connect().await.map_err(|err| {
            error!(error = %err, "database connection failed");
            QueryError::Connection(err)
        })
    }
}

#[async_trait]
impl QueryExecutor for Database {
    #[instrument(skip(self, sql, params), fields(params = params.len()))]
    async fn execute_query(&self, sql: &str, params: &[SqlParam]) -> Result<Table, QueryError> {
        let mut conn = self.connect().await?;

        let protocol = Protocol::for_params(params);
        let fetched = fetch_rows(&mut conn, sql, params).await;
        if let Err(err) = conn.close().await {
            warn!(error = %err, "failed to close database connection");
        }

        let rows = fetched.map_err(|err| {
            error!(error = %err, "database query failed");
            QueryError::Execution(err)
        })?;

        let table = decode::rows_to_table(&rows, protocol)?;
        debug!(rows = table.len(), "query completed");
        Ok(table)
    }
}

async fn fetch_rows(
    conn: &mut MySqlConnection,
    sql: &str,
    params: &[SqlParam],
) -> Result<Vec<MySqlRow>, sqlx::Error> {
    if Protocol::for_params(params) == Protocol::Text {
        return conn.fetch_all(sql).await;
    }

    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            SqlParam::Text(s) => query.bind(s.as_str()),
            SqlParam::Int(n) => query.bind(*n),
        };
    }
    query.fetch_all(conn).await
}
