use async_trait::async_trait;
use thiserror::Error;

use crate::pgqueue::PgQueueError;
use crate::record::RawRecord;

/// Enumeration of errors when fetching a message. An empty queue is not an error.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("queue is unavailable: {0}")]
    QueueError(#[from] PgQueueError),
    #[error("message {id} does not have a JSON object body: {error}")]
    MalformedBody {
        id: i64,
        error: serde_json::Error,
    },
}

/// Anything login events can be pulled from, one at a time.
#[async_trait]
pub trait MessageSource {
    /// Fetch the next message, `None` when nothing is available right now.
    async fn fetch_one(&self) -> Result<Option<RawRecord>, FetchError>;
}
