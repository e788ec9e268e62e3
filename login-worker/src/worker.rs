use std::num::NonZeroU64;
use std::time;

use login_common::health::HealthHandle;
use login_common::record::validate;
use login_common::source::{FetchError, MessageSource};
use login_common::transform::RecordTransformer;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::loader::LoginSink;
use crate::metrics_consts::{
    FETCH_FAILED, LOAD_DURATION, LOAD_FAILED, QUEUE_EMPTY, RECORDS_FETCHED, RECORDS_LOADED,
    RECORDS_REJECTED, TRANSFORM_FAILED,
};

/// Where a single iteration of the pipeline ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The queue had nothing for us.
    Empty,
    /// The queue could not be reached.
    FetchFailed,
    /// The message was unreadable or missing required fields.
    Rejected,
    /// A required field could not be normalized.
    TransformFailed,
    /// The database refused the record.
    LoadFailed,
    /// One row was written.
    Loaded,
}

/// A worker that moves login events from a queue into `user_logins`, one record at a time.
pub struct LoginWorker<Q, S> {
    /// Where raw login events come from.
    queue: Q,
    /// Where normalized logins are written.
    sink: S,
    transformer: RecordTransformer,
    /// Fixed pause after every iteration, whatever its outcome.
    poll_interval: time::Duration,
    /// Log progress every time this many more records have been loaded.
    report_every: NonZeroU64,
    /// Records loaded since the worker started.
    processed: u64,
    /// The liveness check handle, refreshed every time the queue answers.
    liveness: HealthHandle,
}

impl<Q, S> LoginWorker<Q, S>
where
    Q: MessageSource,
    S: LoginSink,
{
    pub fn new(
        queue: Q,
        sink: S,
        transformer: RecordTransformer,
        poll_interval: time::Duration,
        report_every: NonZeroU64,
        liveness: HealthHandle,
    ) -> Self {
        Self {
            queue,
            sink,
            transformer,
            poll_interval,
            report_every,
            processed: 0,
            liveness,
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Run this worker until `shutdown` is cancelled. The token is checked before every fetch
    /// and interrupts the pause between iterations; an in-flight fetch or write always finishes.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!("login worker started");

        while !shutdown.is_cancelled() {
            let outcome = self.process_one().await;
            debug!(?outcome, "iteration finished");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!(processed = self.processed, "login worker stopped");
    }

    /// Fetch, validate, transform and load a single message.
    pub async fn process_one(&mut self) -> Outcome {
        let record = match self.queue.fetch_one().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.liveness.report_healthy();
                debug!("no messages in the queue");
                metrics::counter!(QUEUE_EMPTY).increment(1);
                return Outcome::Empty;
            }
            Err(error @ FetchError::MalformedBody { .. }) => {
                self.liveness.report_healthy();
                warn!("skipping message: {}", error);
                metrics::counter!(RECORDS_REJECTED).increment(1);
                return Outcome::Rejected;
            }
            Err(error) => {
                // Liveness is left to expire so a queue that stays down gets us restarted.
                error!("failed to fetch from the queue: {}", error);
                metrics::counter!(FETCH_FAILED).increment(1);
                return Outcome::FetchFailed;
            }
        };

        self.liveness.report_healthy();
        metrics::counter!(RECORDS_FETCHED).increment(1);
        debug!(
            user_id = record.get("user_id").map(String::as_str).unwrap_or_default(),
            "received login record"
        );

        if let Err(error) = validate(&record) {
            warn!("skipping record: {}", error);
            metrics::counter!(RECORDS_REJECTED).increment(1);
            return Outcome::Rejected;
        }

        let normalized = match self.transformer.transform(&record) {
            Ok(normalized) => normalized,
            Err(error) => {
                warn!("skipping record that failed to transform: {}", error);
                metrics::counter!(TRANSFORM_FAILED).increment(1);
                return Outcome::TransformFailed;
            }
        };

        let now = tokio::time::Instant::now();
        let loaded = self.sink.load(&normalized).await;
        metrics::histogram!(LOAD_DURATION).record(now.elapsed().as_secs_f64());

        match loaded {
            Ok(()) => {
                metrics::counter!(RECORDS_LOADED).increment(1);
                self.processed += 1;
                if self.processed % self.report_every.get() == 0 {
                    info!("{} records added to the database", self.processed);
                }
                Outcome::Loaded
            }
            Err(error) => {
                error!("failed to write data to the database: {}", error);
                metrics::counter!(LOAD_FAILED).increment(1);
                Outcome::LoadFailed
            }
        }
    }
}
