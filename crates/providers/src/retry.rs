//! Bounded retry around a single provider.
//!
//! Each attempt is capped by a timeout. Only transient failures (network,
//! timeout, rate limit, 5xx) are retried, and at most `max_retries` times.
//! Anything else is returned on the first failure.

use async_trait::async_trait;
use fieldrep_core::error::ProviderError;
use fieldrep_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider that retries a wrapped provider on transient failures.
pub struct RetryProvider {
    inner: Arc<dyn Provider>,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl RetryProvider {
    /// Wrap `inner` with a 60s per-attempt timeout and one retry.
    pub fn new(inner: Arc<dyn Provider>) -> Self {
        Self {
            inner,
            timeout: Duration::from_secs(60),
            max_retries: 1,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn attempt(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "Provider '{}' timed out after {}s",
                self.inner.name(),
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut attempt = 0u32;
        loop {
            match self.attempt(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        provider = %self.inner.name(),
                        error = %e,
                        attempt,
                        max_retries = self.max_retries,
                        "Transient provider failure, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => {
                    if attempt > 0 {
                        info!(provider = %self.inner.name(), attempts = attempt + 1, "Giving up");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldrep_core::message::Message;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed script of outcomes, then succeeds.
    struct ScriptedProvider {
        script: Mutex<VecDeque<ProviderError>>,
        call_count: Mutex<usize>,
    }

    impl ScriptedProvider {
        fn failing_with(errors: Vec<ProviderError>) -> Self {
            Self {
                script: Mutex::new(errors.into()),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            if let Some(err) = self.script.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(ProviderResponse {
                message: Message::assistant("success"),
                usage: None,
                model: "test-model".into(),
            })
        }
    }

    /// A provider that hangs forever.
    struct HangingProvider;

    #[async_trait]
    impl Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Network("unreachable".into()))
        }
    }

    fn test_request() -> ProviderRequest {
        ProviderRequest::single_prompt("test", "hello")
    }

    fn retrying(inner: Arc<dyn Provider>) -> RetryProvider {
        RetryProvider::new(inner).with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn success_needs_one_call() {
        let inner = Arc::new(ScriptedProvider::failing_with(vec![]));
        let provider = retrying(inner.clone());
        let response = provider.complete(test_request()).await.unwrap();
        assert_eq!(response.message.content, "success");
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let inner = Arc::new(ScriptedProvider::failing_with(vec![ProviderError::Network(
            "connection reset".into(),
        )]));
        let provider = retrying(inner.clone());
        assert!(provider.complete(test_request()).await.is_ok());
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn retry_budget_is_bounded() {
        let inner = Arc::new(ScriptedProvider::failing_with(vec![
            ProviderError::ApiError {
                status_code: 503,
                message: "busy".into(),
            },
            ProviderError::ApiError {
                status_code: 502,
                message: "bad gateway".into(),
            },
            ProviderError::Network("still down".into()),
        ]));
        let provider = retrying(inner.clone());
        let err = provider.complete(test_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 502, .. }));
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let inner = Arc::new(ScriptedProvider::failing_with(vec![
            ProviderError::AuthenticationFailed("bad key".into()),
        ]));
        let provider = retrying(inner.clone()).with_max_retries(3);
        let err = provider.complete(test_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_response_is_not_retried() {
        let inner = Arc::new(ScriptedProvider::failing_with(vec![
            ProviderError::MalformedResponse("No choices in response".into()),
        ]));
        let provider = retrying(inner.clone());
        assert!(provider.complete(test_request()).await.is_err());
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn zero_retries_fails_fast() {
        let inner = Arc::new(ScriptedProvider::failing_with(vec![ProviderError::Network(
            "reset".into(),
        )]));
        let provider = retrying(inner.clone()).with_max_retries(0);
        assert!(provider.complete(test_request()).await.is_err());
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_provider_times_out() {
        let provider = retrying(Arc::new(HangingProvider)).with_timeout(Duration::from_millis(50));
        let err = provider.complete(test_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
        assert_eq!(provider.name(), "hanging");
    }
}
