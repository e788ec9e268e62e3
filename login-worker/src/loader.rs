use std::str::FromStr;

use async_trait::async_trait;
use login_common::record::NormalizedRecord;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::warn;

use crate::error::PersistenceError;

const INSERT_LOGIN: &str = r#"
INSERT INTO user_logins
    (user_id, device_type, masked_ip, masked_device_id, locale, app_version, create_date)
VALUES
    ($1, $2, $3, $4, $5, $6, $7)
"#;

/// Somewhere normalized logins are written to, one at a time.
#[async_trait]
pub trait LoginSink {
    /// Persist a single record. On error nothing has been written.
    async fn load(&self, record: &NormalizedRecord) -> Result<(), PersistenceError>;
}

/// Writes each record to `user_logins` over its own connection and transaction.
///
/// Connections are never pooled or reused: every call connects, inserts, commits and closes,
/// so nothing outlives the record it was opened for.
pub struct PgLoader {
    options: PgConnectOptions,
}

impl PgLoader {
    pub fn new(options: PgConnectOptions) -> Self {
        Self { options }
    }

    pub fn from_url(url: &str) -> Result<Self, PersistenceError> {
        let options = PgConnectOptions::from_str(url).map_err(PersistenceError::InvalidUrl)?;

        Ok(Self::new(options))
    }
}

#[async_trait]
impl LoginSink for PgLoader {
    async fn load(&self, record: &NormalizedRecord) -> Result<(), PersistenceError> {
        let mut connection = PgConnection::connect_with(&self.options)
            .await
            .map_err(PersistenceError::ConnectionError)?;

        let result = insert(&mut connection, record).await;

        if let Err(error) = connection.close().await {
            warn!("failed to close database connection: {}", error);
        }

        result
    }
}

/// Insert `record` in a transaction on `connection`, rolling back on failure.
async fn insert(
    connection: &mut PgConnection,
    record: &NormalizedRecord,
) -> Result<(), PersistenceError> {
    let mut transaction = connection
        .begin()
        .await
        .map_err(|error| PersistenceError::QueryError {
            command: "BEGIN",
            error,
        })?;

    let inserted = sqlx::query(INSERT_LOGIN)
        .bind(&record.user_id)
        .bind(&record.device_type)
        .bind(&record.masked_ip)
        .bind(&record.masked_device_id)
        .bind(&record.locale)
        .bind(record.app_version)
        .bind(record.create_date)
        .execute(&mut *transaction)
        .await;

    match inserted {
        Ok(_) => transaction
            .commit()
            .await
            .map_err(|error| PersistenceError::QueryError {
                command: "COMMIT",
                error,
            }),
        Err(error) => {
            if let Err(rollback_error) = transaction.rollback().await {
                warn!("failed to roll back login insert: {}", rollback_error);
            }
            Err(PersistenceError::QueryError {
                command: "INSERT",
                error,
            })
        }
    }
}
