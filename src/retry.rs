use std::time::Duration;

use reqwest::{Method, StatusCode};

use crate::ClientOptions;

/// Transport-level retry policy.
///
/// Connection failures are retried for every method. Timeouts and transient
/// statuses are retried only for idempotent methods. Backend business
/// failures go through `on_backend_fail` instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base backoff in milliseconds, doubled per attempt.
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn from_options(options: &ClientOptions) -> Self {
        Self {
            max_retries: options.max_retries,
            backoff_ms: options.retry_backoff_ms,
        }
    }

    pub fn allows(&self, attempt: usize) -> bool {
        attempt < self.max_retries
    }

    /// GET, HEAD, OPTIONS, PUT and DELETE.
    pub fn is_idempotent(method: &Method) -> bool {
        [Method::GET, Method::HEAD, Method::OPTIONS, Method::PUT, Method::DELETE].contains(method)
    }

    pub fn should_retry_status(&self, method: &Method, status: StatusCode) -> bool {
        let transient = matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        );
        transient && Self::is_idempotent(method)
    }

    /// Connect errors are retried for every method.
    pub fn should_retry_transport(&self, method: &Method, err: &reqwest::Error) -> bool {
        if err.is_connect() {
            return true;
        }
        Self::is_idempotent(method) && (err.is_timeout() || err.is_request() || err.is_body())
    }

    /// Exponential backoff before retry number `attempt + 1`.
    pub fn delay(&self, attempt: usize) -> Duration {
        let exp = attempt.min(16) as u32;
        Duration::from_millis(self.backoff_ms.saturating_mul(1u64 << exp))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::{Method, StatusCode};

    use super::RetryPolicy;
    use crate::ClientOptions;

    #[test]
    fn default_options_never_retry() {
        let policy = RetryPolicy::from_options(&ClientOptions::default());
        assert!(!policy.allows(0));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff_ms: 100,
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        let huge = RetryPolicy {
            max_retries: 1,
            backoff_ms: u64::MAX,
        };
        assert_eq!(huge.delay(5), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn only_transient_statuses_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry_status(&Method::GET, StatusCode::SERVICE_UNAVAILABLE));
        assert!(policy.should_retry_status(&Method::PUT, StatusCode::TOO_MANY_REQUESTS));
        assert!(!policy.should_retry_status(&Method::GET, StatusCode::NOT_FOUND));
        assert!(!policy.should_retry_status(&Method::GET, StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn non_idempotent_methods_skip_status_retries() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry_status(&Method::POST, StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!policy.should_retry_status(&Method::PATCH, StatusCode::SERVICE_UNAVAILABLE));
        assert!(RetryPolicy::is_idempotent(&Method::DELETE));
        assert!(!RetryPolicy::is_idempotent(&Method::POST));
    }
}
