//! A login event queue backed by a PostgreSQL table.
use async_trait::async_trait;
use chrono::prelude::*;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::record::{raw_record_from_json, RawRecord};
use crate::source::{FetchError, MessageSource};

/// Enumeration of errors for operations with PgQueue.
/// Errors can originate from sqlx and are wrapped by us to provide additional context.
#[derive(Error, Debug)]
pub enum PgQueueError {
    #[error("connection failed with: {error}")]
    ConnectionError { error: sqlx::Error },
    #[error("{command} query failed with: {error}")]
    QueryError { command: String, error: sqlx::Error },
}

/// Enumeration of possible statuses for a queued message.
/// Available: A message waiting to be picked up by a worker.
/// Consumed: A message that was handed to a worker. It is never handed out again.
#[derive(Debug, PartialEq, Eq, Clone, Copy, sqlx::Type)]
#[sqlx(type_name = "queue_status")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageStatus {
    Available,
    Consumed,
}

/// A message as stored in the queue table. The body is kept as raw JSON until a worker
/// decodes it.
#[derive(Debug, sqlx::FromRow)]
pub struct QueuedMessage {
    pub id: i64,
    pub body: serde_json::Value,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub consumed_by: Option<String>,
}

/// A queue implemented on top of a PostgreSQL table.
pub struct PgQueue {
    /// The table messages are read from and written to.
    table: String,
    /// Recorded on every message this queue hands out.
    worker: String,
    pool: PgPool,
}

pub type PgQueueResult<T> = std::result::Result<T, PgQueueError>;

impl PgQueue {
    /// Initialize a new PgQueue backed by table in PostgreSQL.
    pub async fn new(
        table: &str,
        worker: &str,
        url: &str,
        max_connections: u32,
    ) -> PgQueueResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|error| PgQueueError::ConnectionError { error })?;

        Ok(Self::new_from_pool(table, worker, pool))
    }

    /// Initialize a new PgQueue on top of an existing pool.
    pub fn new_from_pool(table: &str, worker: &str, pool: PgPool) -> Self {
        Self {
            table: table.to_owned(),
            worker: worker.to_owned(),
            pool,
        }
    }

    /// Claim the oldest available message, or return `None` if there are none.
    pub async fn dequeue(&self) -> PgQueueResult<Option<QueuedMessage>> {
        let base_query = format!(
            r#"
WITH available_in_queue AS (
    SELECT
        id
    FROM
        "{0}"
    WHERE
        status = 'available'
    ORDER BY
        id
    LIMIT 1
    FOR UPDATE SKIP LOCKED
)
UPDATE
    "{0}"
SET
    consumed_at = NOW(),
    consumed_by = $1,
    status = 'consumed'::queue_status
FROM
    available_in_queue
WHERE
    "{0}".id = available_in_queue.id
RETURNING
    "{0}".id, "{0}".body, "{0}".status, "{0}".created_at, "{0}".consumed_at, "{0}".consumed_by
            "#,
            &self.table
        );

        sqlx::query_as(&base_query)
            .bind(&self.worker)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| PgQueueError::QueryError {
                command: "UPDATE".to_owned(),
                error,
            })
    }

    /// Append a message to this PgQueue, returning its id.
    pub async fn enqueue<B: Serialize + Sync>(&self, body: &B) -> PgQueueResult<i64> {
        let base_query = format!(
            r#"
INSERT INTO "{}"
    (body, status, created_at)
VALUES
    ($1, 'available'::queue_status, NOW())
RETURNING id
            "#,
            &self.table
        );

        sqlx::query_scalar(&base_query)
            .bind(sqlx::types::Json(body))
            .fetch_one(&self.pool)
            .await
            .map_err(|error| PgQueueError::QueryError {
                command: "INSERT".to_owned(),
                error,
            })
    }
}

#[async_trait]
impl MessageSource for PgQueue {
    async fn fetch_one(&self) -> Result<Option<RawRecord>, FetchError> {
        let message = match self.dequeue().await? {
            Some(message) => message,
            None => return Ok(None),
        };

        let id = message.id;
        raw_record_from_json(message.body)
            .map(Some)
            .map_err(|error| FetchError::MalformedBody { id, error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TABLE: &str = "login_events_queue";

    #[sqlx::test(migrations = "../migrations")]
    async fn test_can_enqueue_and_dequeue_message(db: PgPool) {
        let queue = PgQueue::new_from_pool(TABLE, "test-worker", db);

        let body = json!({"user_id": "12345", "app_version": "1.2.3"});
        let id = queue.enqueue(&body).await.expect("failed to enqueue");

        let message = queue
            .dequeue()
            .await
            .expect("failed to dequeue")
            .expect("queue should not be empty");

        assert_eq!(message.id, id);
        assert_eq!(message.body, body);
        assert_eq!(message.status, MessageStatus::Consumed);
        assert_eq!(message.consumed_by.as_deref(), Some("test-worker"));
        assert!(message.consumed_at.is_some());

        assert!(queue.dequeue().await.expect("failed to dequeue").is_none());
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_fetch_one_preserves_order(db: PgPool) {
        let queue = PgQueue::new_from_pool(TABLE, "test-worker", db);

        for user_id in ["1", "2", "3"] {
            queue
                .enqueue(&json!({ "user_id": user_id }))
                .await
                .expect("failed to enqueue");
        }

        for user_id in ["1", "2", "3"] {
            let record = queue
                .fetch_one()
                .await
                .expect("failed to fetch")
                .expect("queue should not be empty");
            assert_eq!(record.get("user_id").map(String::as_str), Some(user_id));
        }

        assert!(queue.fetch_one().await.expect("failed to fetch").is_none());
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_fetch_one_reports_malformed_body(db: PgPool) {
        let queue = PgQueue::new_from_pool(TABLE, "test-worker", db);

        let id = queue
            .enqueue(&json!(["user_id", "12345"]))
            .await
            .expect("failed to enqueue");

        match queue.fetch_one().await {
            Err(FetchError::MalformedBody { id: bad_id, .. }) => assert_eq!(bad_id, id),
            other => panic!("expected a malformed body, got {:?}", other),
        }

        // The malformed message is consumed, not redelivered.
        assert!(queue.fetch_one().await.expect("failed to fetch").is_none());
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_fetch_one_on_missing_table_is_an_error(db: PgPool) {
        let queue = PgQueue::new_from_pool("no_such_queue", "test-worker", db);

        assert!(matches!(
            queue.fetch_one().await,
            Err(FetchError::QueueError(PgQueueError::QueryError { .. }))
        ));
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_fetch_one_skips_non_string_values(db: PgPool) {
        let queue = PgQueue::new_from_pool(TABLE, "test-worker", db);

        queue
            .enqueue(&json!({"user_id": "12345", "retries": 2, "context": {"screen": "login"}}))
            .await
            .expect("failed to enqueue");

        let record = queue
            .fetch_one()
            .await
            .expect("failed to fetch")
            .expect("queue should not be empty");
        assert_eq!(
            record,
            RawRecord::from([("user_id".to_owned(), "12345".to_owned())])
        );
    }
}
