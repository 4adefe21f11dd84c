use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::DispatchConfig;
use crate::error::{TaskError, TaskResult};
use crate::task::ResultEnvelope;

pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Whether a provider call only reads or also changes remote state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

/// Describes one outbound call for the dispatcher
#[derive(Debug, Clone)]
pub struct DispatchRequest<'a> {
    pub name: &'a str,
    pub kind: OperationKind,
    pub has_credential: bool,
    /// Shown when a write is attempted without a credential
    pub credential_hint: &'a str,
}

/// What a dispatch attempt produced
#[derive(Debug)]
pub enum DispatchOutcome<T> {
    Live(T),
    Mock,
    Failed(TaskError),
}

/// Wraps provider calls with bounded retry and the mock/live decision
#[derive(Debug, Clone)]
pub struct RetryingApiDispatcher {
    max_retries: u32,
    base_delay: Duration,
    mock_without_credentials: bool,
}

impl RetryingApiDispatcher {
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            mock_without_credentials: config.mock_without_credentials,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `operation` and decide between the live result, mock data, or failure.
    pub async fn run<T, F, Fut>(&self, request: &DispatchRequest<'_>, operation: F) -> DispatchOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TaskResult<T>>,
    {
        if !request.has_credential {
            match request.kind {
                OperationKind::Write => {
                    return DispatchOutcome::Failed(TaskError::auth(
                        format!("'{}' needs a credential and none is configured", request.name),
                        request.credential_hint,
                    ));
                }
                OperationKind::Read if self.mock_without_credentials => {
                    log::info!("No credential for '{}', serving mock data", request.name);
                    return DispatchOutcome::Mock;
                }
                OperationKind::Read => {}
            }
        }

        match self.retry(request.name, operation).await {
            Ok(value) => DispatchOutcome::Live(value),
            Err(err @ TaskError::Validation { .. }) => DispatchOutcome::Failed(err),
            Err(err) if !request.has_credential && request.kind == OperationKind::Read => {
                log::info!("'{}' failed without a credential ({}), serving mock data", request.name, err);
                DispatchOutcome::Mock
            }
            Err(err) => DispatchOutcome::Failed(err),
        }
    }

    /// Like [`run`](Self::run) but folds the outcome into an envelope.
    pub async fn dispatch<T, F, Fut>(
        &self,
        request: &DispatchRequest<'_>,
        operation: F,
        format: impl FnOnce(T) -> ResultEnvelope,
        mock: impl FnOnce() -> ResultEnvelope,
    ) -> ResultEnvelope
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TaskResult<T>>,
    {
        match self.run(request, operation).await {
            DispatchOutcome::Live(value) => format(value),
            DispatchOutcome::Mock => mock(),
            DispatchOutcome::Failed(err) => {
                log::error!("'{}' failed: {}", request.name, err);
                err.into()
            }
        }
    }

    /// `base_delay * 2^(attempt-1)`, capped at [`MAX_BACKOFF`]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// At most `max_retries` attempts with exponential backoff between them
    async fn retry<T, F, Fut>(&self, name: &str, mut operation: F) -> TaskResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TaskResult<T>>,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempts >= self.max_retries => {
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff(attempts);
                    log::warn!(
                        "'{}' failed, retrying in {:?} (attempt {}/{}): {}",
                        name,
                        delay,
                        attempts,
                        self.max_retries,
                        e
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn dispatcher(max_retries: u32, mock_without_credentials: bool) -> RetryingApiDispatcher {
        RetryingApiDispatcher::new(&DispatchConfig {
            max_retries,
            base_delay_ms: 0,
            http_timeout_secs: 5,
            mock_without_credentials,
        })
    }

    fn request(kind: OperationKind, has_credential: bool) -> DispatchRequest<'static> {
        DispatchRequest {
            name: "test_call",
            kind,
            has_credential,
            credential_hint: "Set TEST_TOKEN",
        }
    }

    #[tokio::test]
    async fn test_always_failing_call_is_attempted_max_retries_times() {
        let attempts = AtomicU32::new(0);
        let outcome: DispatchOutcome<()> = dispatcher(3, true)
            .run(&request(OperationKind::Read, true), || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(TaskError::TransientProvider("connection refused".to_string())) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(matches!(outcome, DispatchOutcome::Failed(TaskError::TransientProvider(_))));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let attempts = AtomicU32::new(0);
        let outcome = dispatcher(3, true)
            .run(&request(OperationKind::Write, true), || {
                let previous = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if previous == 0 {
                        Err(TaskError::TransientProvider("503".to_string()))
                    } else {
                        Ok("created")
                    }
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(matches!(outcome, DispatchOutcome::Live("created")));
    }

    #[tokio::test]
    async fn test_validation_error_is_not_retried_or_mocked() {
        let attempts = AtomicU32::new(0);
        let outcome: DispatchOutcome<()> = dispatcher(3, false)
            .run(&request(OperationKind::Read, false), || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(TaskError::validation("repo", "pass repo")) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(outcome, DispatchOutcome::Failed(TaskError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_auth_error_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let outcome: DispatchOutcome<()> = dispatcher(3, true)
            .run(&request(OperationKind::Read, true), || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(TaskError::auth("bad token", "refresh it")) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(outcome, DispatchOutcome::Failed(TaskError::Auth { .. })));
    }

    #[tokio::test]
    async fn test_read_without_credential_is_mocked_without_calling() {
        let attempts = AtomicU32::new(0);
        let envelope = dispatcher(3, true)
            .dispatch(
                &request(OperationKind::Read, false),
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                |_| ResultEnvelope::success("live", None),
                || ResultEnvelope::mock("sample", None),
            )
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert!(envelope.success);
        assert_eq!(envelope.mock_data, Some(true));
    }

    #[tokio::test]
    async fn test_read_without_credential_mocks_after_exhaustion() {
        let attempts = AtomicU32::new(0);
        let envelope = dispatcher(2, false)
            .dispatch(
                &request(OperationKind::Read, false),
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(TaskError::TransientProvider("timeout".to_string())) }
                },
                |_| ResultEnvelope::success("live", None),
                || ResultEnvelope::mock("sample", None),
            )
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(envelope.is_mock());
    }

    #[tokio::test]
    async fn test_write_without_credential_is_auth_failure() {
        let attempts = AtomicU32::new(0);
        let envelope = dispatcher(3, true)
            .dispatch(
                &request(OperationKind::Write, false),
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                |_| ResultEnvelope::success("live", None),
                || ResultEnvelope::mock("sample", None),
            )
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert!(!envelope.success);
        assert!(envelope.content.contains("Set TEST_TOKEN"));
        assert_eq!(envelope.mock_data, None);
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        assert_eq!(dispatcher(0, true).max_retries(), 1);
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let capped = RetryingApiDispatcher::new(&DispatchConfig {
            base_delay_ms: 1000,
            ..DispatchConfig::default()
        });
        assert_eq!(capped.backoff(1), Duration::from_secs(1));
        assert_eq!(capped.backoff(3), Duration::from_secs(4));
        assert_eq!(capped.backoff(6), MAX_BACKOFF);
        assert_eq!(capped.backoff(40), MAX_BACKOFF);
        assert_eq!(capped.backoff(u32::MAX), MAX_BACKOFF);
        assert_eq!(dispatcher(3, true).backoff(40), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_many_attempts_do_not_overflow() {
        let attempts = AtomicU32::new(0);
        let outcome: DispatchOutcome<()> = dispatcher(40, true)
            .run(&request(OperationKind::Read, true), || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(TaskError::TransientProvider("503".to_string())) }
            })
            .await;

        assert!(matches!(outcome, DispatchOutcome::Failed(TaskError::TransientProvider(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 40);
    }

}
