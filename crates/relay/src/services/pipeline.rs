//! Background processing of accepted messages.
//!
//! Runs after the webhook has been acknowledged: dispatch the request,
//! format the reply and deliver it. Failures end here; they are logged and
//! never reach the HTTP response.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::agent::Dispatcher;
use crate::slack::{Ack, OutboundMessage, SlackClient, SlackError, format_reply};

use super::intake::Job;

/// Posted when the request itself could not be handled.
pub const FAILURE_TEXT: &str =
    "Sorry, something went wrong while handling your request. Please try again in a moment.";

/// Dispatch a job and deliver the reply to its channel.
///
/// A dispatcher failure is answered with [`FAILURE_TEXT`].
///
/// # Errors
///
/// Returns the delivery error after it has been logged.
#[instrument(skip(dispatcher, slack, job), fields(channel = %job.channel, user = ?job.user))]
pub async fn process_event(
    dispatcher: &Dispatcher,
    slack: &SlackClient,
    job: &Job,
) -> Result<Ack, SlackError> {
    let message = match dispatcher.handle(&job.text).await {
        Ok(reply) => {
            debug!(structured = reply.is_structured(), "Reply ready");
            format_reply(&reply)
        }
        Err(e) => {
            error!(error = %e, "Dispatch failed");
            OutboundMessage::Text(FAILURE_TEXT.to_string())
        }
    };

    match slack.send(&job.channel, &message).await {
        Ok(ack) => {
            info!(attempts = ack.attempts, ts = ?ack.ts, "Reply delivered");
            Ok(ack)
        }
        Err(e) => {
            error!(error = %e, "Reply delivery failed");
            Err(e)
        }
    }
}

/// Returned by [`PipelineTasks::spawn`] once shutdown has begun.
#[derive(Debug, Error)]
#[error("relay is shutting down")]
pub struct Draining;

/// In-flight pipeline tasks.
///
/// Shutdown calls [`drain`](Self::drain) so replies already accepted from
/// Slack are delivered before the process exits.
#[derive(Clone, Default)]
pub struct PipelineTasks {
    inner: Arc<Mutex<TaskSet>>,
}

#[derive(Default)]
struct TaskSet {
    workers: JoinSet<()>,
    draining: bool,
}

impl std::fmt::Debug for PipelineTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineTasks").finish_non_exhaustive()
    }
}

impl PipelineTasks {
    /// Run [`process_event`] on a tracked background task.
    ///
    /// # Errors
    ///
    /// Returns [`Draining`] once [`drain`](Self::drain) has been called.
    pub async fn spawn(
        &self,
        dispatcher: Dispatcher,
        slack: SlackClient,
        job: Job,
    ) -> Result<(), Draining> {
        let mut tasks = self.inner.lock().await;
        if tasks.draining {
            return Err(Draining);
        }
        while let Some(result) = tasks.workers.try_join_next() {
            log_join_result(result);
        }

        let span = info_span!("pipeline", task_id = %Uuid::new_v4());
        tasks.workers.spawn(
            async move {
                let _ = process_event(&dispatcher, &slack, &job).await;
            }
            .instrument(span),
        );
        Ok(())
    }

    /// Stop accepting work and wait up to `grace` for running tasks.
    ///
    /// Tasks still running after `grace` are aborted. Returns how many were.
    pub async fn drain(&self, grace: Duration) -> usize {
        let mut workers = {
            let mut tasks = self.inner.lock().await;
            tasks.draining = true;
            std::mem::take(&mut tasks.workers)
        };
        info!(in_flight = workers.len(), "Draining pipeline tasks");

        let finished = tokio::time::timeout(grace, async {
            while let Some(result) = workers.join_next().await {
                log_join_result(result);
            }
        })
        .await;
        if finished.is_ok() {
            return 0;
        }

        let aborted = workers.len();
        warn!(aborted, "Pipeline tasks still running after grace period");
        workers.shutdown().await;
        aborted
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_panic() => error!(error = %e, "Pipeline task panicked"),
        Err(e) => debug!(error = %e, "Pipeline task cancelled"),
    }
}
