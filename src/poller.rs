//! Task status polling
//!
//! Turns the fire-and-forget export request into a reliably observed terminal
//! result. A status fetch yields an explicit [`PollOutcome`] rather than
//! abusing errors for control flow; the loop here interprets `Active` as
//! "sleep and re-check" against the configured backoff schedule.

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::export::{status_path, ExportTask};
use crate::retry::{Backoff, IsRetryable};
use crate::transport::Transport;
use reqwest::Method;

/// Result of a single status fetch
#[derive(Debug)]
pub enum PollOutcome {
    /// The task is still SUBMITTED or IN_PROGRESS
    Active,
    /// The task reached a terminal status
    ///
    /// Any status that is not explicitly active counts as terminal, including
    /// status strings this client does not recognize. Deliberately
    /// permissive: an unexpected vocabulary addition must not spin the loop
    /// forever.
    Ready(ExportTask),
}

/// Polls an export task until it leaves the active states or the retry
/// budget runs out
pub struct TaskPoller<'a> {
    transport: &'a Transport,
    retry: RetryConfig,
}

impl<'a> TaskPoller<'a> {
    /// Create a poller over `transport` with the given schedule
    pub fn new(transport: &'a Transport, retry: RetryConfig) -> Self {
        Self { transport, retry }
    }

    /// Poll until the task is terminal
    ///
    /// Active statuses and retryable fetch errors (a dropped connection is
    /// indistinguishable from "still working") both wait out a backoff delay
    /// and re-check. Non-retryable errors abort immediately. An exhausted
    /// attempt budget yields [`Error::PollTimeout`] carrying the task id so
    /// the caller can retrieve the results manually later; no further fetch
    /// is issued past the final attempt.
    pub async fn wait_for_completion(&self, task_id: &str) -> Result<ExportTask> {
        let mut backoff = Backoff::new(&self.retry);

        for attempt in 1..=self.retry.max_attempts {
            match self.poll_once(task_id).await {
                Ok(PollOutcome::Ready(task)) => {
                    tracing::info!(
                        task_id,
                        status = %task.status,
                        attempt,
                        "export task reached a terminal status"
                    );
                    return Ok(task);
                }
                Ok(PollOutcome::Active) => {
                    tracing::debug!(task_id, attempt, "export task still active");
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(task_id, attempt, error = %e, "status check failed, will retry");
                }
                Err(e) => return Err(e),
            }

            if attempt < self.retry.max_attempts {
                tokio::time::sleep(backoff.next_delay()).await;
            }
        }

        Err(Error::PollTimeout {
            task_id: task_id.to_string(),
            attempts: self.retry.max_attempts,
        })
    }

    /// Fetch the task once and classify its status
    pub async fn poll_once(&self, task_id: &str) -> Result<PollOutcome> {
        let task: ExportTask = self
            .transport
            .send(Method::GET, &status_path(task_id), None)
            .await?
            .into_typed()?;

        if task.status.is_active() {
            Ok(PollOutcome::Active)
        } else {
            Ok(PollOutcome::Ready(task))
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::TaskStatus;
    use crate::signer::tests::test_credentials;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TASK_PATH: &str = "/api/v1/bots/insights/dataExports/task-1";

    fn status_body(status: &str) -> serde_json::Value {
        serde_json::json!({"id": "task-1", "status": status})
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 3.0,
        }
    }

    async fn transport_for(server: &MockServer) -> Transport {
        Transport::new(&server.uri(), test_credentials()).unwrap()
    }

    #[tokio::test]
    async fn resolves_on_the_third_attempt_after_two_active_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TASK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("IN_PROGRESS")))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(TASK_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(status_body("EXPORT_SUCCEEDED")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server).await;
        let poller = TaskPoller::new(&transport, fast_retry(20));
        let task = poller.wait_for_completion("task-1").await.unwrap();

        assert_eq!(task.status, TaskStatus::ExportSucceeded);
        // mock expectations on drop verify exactly 3 fetches happened
    }

    #[tokio::test]
    async fn two_retries_wait_out_the_first_two_backoff_delays() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TASK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("IN_PROGRESS")))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(TASK_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(status_body("EXPORT_SUCCEEDED")),
            )
            .mount(&server)
            .await;

        let transport = transport_for(&server).await;
        // Default schedule: 200ms then 600ms before the final attempt
        let poller = TaskPoller::new(&transport, RetryConfig::default());

        let start = std::time::Instant::now();
        poller.wait_for_completion("task-1").await.unwrap();
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(800),
            "should wait 200ms + 600ms across the two retries, waited {elapsed:?}"
        );
        assert!(
            elapsed < Duration::from_secs(5),
            "should not wait beyond the first two delays, waited {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn exhausted_budget_is_a_poll_timeout_with_no_extra_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TASK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("IN_PROGRESS")))
            .expect(20)
            .mount(&server)
            .await;

        let transport = transport_for(&server).await;
        let poller = TaskPoller::new(
            &transport,
            RetryConfig {
                max_attempts: 20,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                backoff_multiplier: 1.5,
            },
        );

        let err = poller.wait_for_completion("task-1").await.unwrap_err();
        match err {
            Error::PollTimeout { task_id, attempts } => {
                assert_eq!(task_id, "task-1");
                assert_eq!(attempts, 20);
            }
            other => panic!("expected PollTimeout, got {other:?}"),
        }
        // expect(20) on the mock verifies a 21st fetch was never issued
    }

    #[tokio::test]
    async fn non_retryable_error_aborts_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TASK_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "title": "Not Found",
                "detail": "no such export task"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server).await;
        let poller = TaskPoller::new(&transport, fast_retry(20));

        let err = poller.wait_for_completion("task-1").await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn unrecognized_status_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TASK_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(status_body("FUTURE_STATUS")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server).await;
        let poller = TaskPoller::new(&transport, fast_retry(20));
        let task = poller.wait_for_completion("task-1").await.unwrap();

        assert_eq!(task.status, TaskStatus::Other("FUTURE_STATUS".to_string()));
    }

    #[tokio::test]
    async fn submitted_counts_as_active() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TASK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("SUBMITTED")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(TASK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("NO_DATA")))
            .mount(&server)
            .await;

        let transport = transport_for(&server).await;
        let poller = TaskPoller::new(&transport, fast_retry(5));
        let task = poller.wait_for_completion("task-1").await.unwrap();
        assert_eq!(task.status, TaskStatus::NoData);
    }
}
