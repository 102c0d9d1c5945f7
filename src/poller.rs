//! Task polling to terminal status.
//!
//! The poller repeatedly queries a server-side task until it reaches
//! `Success` or `Failed`, or the configured deadline elapses. It holds no
//! per-task state, so one poller instance is safe to use concurrently across
//! distinct task identifiers.
//!
//! Failure discipline:
//! - transient query failures retry with bounded exponential backoff and are
//!   never treated as task failure;
//! - a deadline without terminal status is a `Timeout` error; the caller's
//!   resource stays `Pending` and the same task id resumes on the next
//!   reconcile;
//! - terminal `Failed` surfaces as `TaskFailed` carrying the remote task's
//!   native error message, and is never retried here.
//!
//! A task already terminal when polling starts is answered after exactly one
//! confirmation query: the deadline check runs after the query, not before.

use crate::error::{ReconcileError, ReconcileResult};
use crate::remote::{ControlPlane, RemoteError};
use crate::retry::{RetryConfig, retry_with_backoff};
use crate::task::{AsyncTask, TaskStatus};
use log::{debug, warn};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Polling parameters.
///
/// No cloud SLA is assumed; the defaults are deliberately conservative and
/// callers wrapping a specific API should tune them.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Overall deadline for reaching a terminal status
    pub timeout: Duration,
    /// Delay between status queries
    pub interval: Duration,
    /// Bounded retry for transient query failures
    pub retry: RetryConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            interval: Duration::from_secs(5),
            retry: RetryConfig::with_max_attempts(5),
        }
    }
}

/// Polls server-side tasks to terminal status.
#[derive(Debug, Clone, Default)]
pub struct TaskPoller {
    config: PollConfig,
}

impl TaskPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll until terminal status, without a cancellation signal.
    ///
    /// Returns `Ok(())` only when the task reached `Success`; every other
    /// outcome is a typed error.
    pub async fn poll<C: ControlPlane>(
        &self,
        remote: &C,
        task: &mut AsyncTask,
    ) -> ReconcileResult<()> {
        self.poll_with_cancel(remote, task, None).await
    }

    /// Poll until terminal status, aborting promptly between intervals when
    /// the cancellation signal flips to `true`.
    ///
    /// Cancellation never interrupts an in-flight status query.
    pub async fn poll_with_cancel<C: ControlPlane>(
        &self,
        remote: &C,
        task: &mut AsyncTask,
        mut cancel: Option<&mut watch::Receiver<bool>>,
    ) -> ReconcileResult<()> {
        let deadline = Instant::now() + self.config.timeout;

        loop {
            let report = self.query_status(remote, task).await?;

            let status = match TaskStatus::from_wire(&report.status) {
                Some(status) => status,
                None => {
                    // An unrecognized status is an intermediate state we do
                    // not know yet, not a failure.
                    warn!(
                        "task {}: unrecognized status '{}', treating as running",
                        task.id, report.status
                    );
                    TaskStatus::Running
                }
            };
            task.observe(status);

            match status {
                TaskStatus::Success => {
                    debug!("task {} ({}) succeeded", task.id, task.kind);
                    return Ok(());
                }
                TaskStatus::Failed => {
                    let message = report
                        .error_message
                        .unwrap_or_else(|| "task failed without an error message".to_string());
                    return Err(ReconcileError::TaskFailed {
                        task_id: task.id.clone(),
                        message,
                    });
                }
                TaskStatus::Running => {}
            }

            if Instant::now() >= deadline {
                return Err(ReconcileError::Timeout {
                    task_id: task.id.clone(),
                    waited_secs: self.config.timeout.as_secs(),
                });
            }

            match cancel.as_deref_mut() {
                Some(rx) => {
                    // A watch update that is not a cancellation (value still
                    // false) waits out the remainder of the interval instead
                    // of triggering an early re-query.
                    let wake = Instant::now() + self.config.interval;
                    loop {
                        tokio::select! {
                            _ = tokio::time::sleep_until(wake) => break,
                            changed = rx.changed() => {
                                if changed.is_err() || *rx.borrow() {
                                    debug!("task {}: polling cancelled", task.id);
                                    return Err(ReconcileError::Cancelled {
                                        task_id: task.id.clone(),
                                    });
                                }
                            }
                        }
                    }
                }
                None => tokio::time::sleep(self.config.interval).await,
            }
        }
    }

    /// One status query with bounded retry of transient failures.
    async fn query_status<C: ControlPlane>(
        &self,
        remote: &C,
        task: &AsyncTask,
    ) -> ReconcileResult<crate::remote::TaskReport> {
        // The retry loop only sees transient errors; everything else passes
        // through as an immediate answer.
        let outcome = retry_with_backoff(&self.config.retry, "describe_task", || async {
            match remote.describe_task(&task.id).await {
                Err(err @ RemoteError::Transient { .. }) => Err(err),
                other => Ok(other),
            }
        })
        .await;

        match outcome {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(RemoteError::NotFound { kind, id })) => Err(ReconcileError::not_found(kind, id)),
            Ok(Err(RemoteError::Api { code, message })) => Err(ReconcileError::api(
                "describe_task",
                format!("{code}: {message}"),
            )),
            Ok(Err(RemoteError::Transient { message })) | Err(RemoteError::Transient { message }) => {
                Err(ReconcileError::transient("describe_task", message))
            }
            Err(other) => Err(ReconcileError::transient("describe_task", other.to_string())),
        }
    }
}
