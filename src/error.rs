//! Error types for the data-access layer.

use thiserror::Error;

/// Failures raised while talking to the registration database.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("database query failed: {0}")]
    Execution(#[source] sqlx::Error),

    #[error("cannot decode column `{column}`: {source}")]
    Decode {
        column: String,
        #[source]
        source: sqlx::Error,
    },
}
