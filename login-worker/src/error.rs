use login_common::pgqueue::PgQueueError;
use thiserror::Error;

/// Enumeration of errors when writing a login to the database. None of them are retried.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("invalid database url: {0}")]
    InvalidUrl(sqlx::Error),
    #[error("connection failed with: {0}")]
    ConnectionError(sqlx::Error),
    #[error("{command} failed with: {error}")]
    QueryError {
        command: &'static str,
        error: sqlx::Error,
    },
}

/// Enumeration of errors that prevent the worker from starting.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("invalid configuration: {0}")]
    ConfigError(#[from] envconfig::Error),
    #[error("failed to initialize the queue: {0}")]
    QueueError(#[from] PgQueueError),
    #[error("failed to initialize the loader: {0}")]
    LoaderError(#[from] PersistenceError),
    #[error("failed to install the metrics recorder: {0}")]
    MetricsError(#[from] metrics_exporter_prometheus::BuildError),
    #[error("failed to bind health and metrics server on {bind}: {error}")]
    ServerError { bind: String, error: std::io::Error },
}
