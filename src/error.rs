use serde_json::Value as JsonValue;

use crate::RequestId;

/// Error code carried by every synthetic backend error.
pub const BACKEND_ERROR_CODE: &str = "BACKEND_ERROR";

/// Backend-level failure: HTTP succeeded but the envelope reported an error
/// and no recovery hook produced a replacement response.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendError {
    /// Business code extracted from the envelope, if any.
    pub code: Option<String>,
    /// Message extracted from the envelope, if any.
    pub message: Option<String>,
    /// HTTP status of the response that carried the envelope.
    pub status: u16,
    /// The raw envelope.
    pub body: JsonValue,
}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// HTTP status outside the accepted range with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// The request was cancelled through its cancellation signal.
    #[error("request {request_id} was cancelled")]
    Cancelled { request_id: RequestId },
    /// Backend-level failure that no hook recovered from.
    #[error("the backend request error: {}", .0.message.as_deref().unwrap_or("unknown"))]
    Backend(BackendError),
    /// Response body did not match its declared shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// Configuration value could not be parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl RequestError {
    /// Stable textual kind of this error.
    ///
    /// Synthetic backend errors report [`BACKEND_ERROR_CODE`].
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(err) if err.is_timeout() => "ECONNABORTED",
            Self::Transport(_) => "ERR_NETWORK",
            Self::Http { .. } => "ERR_BAD_RESPONSE",
            Self::Cancelled { .. } => "ERR_CANCELED",
            Self::Backend(_) => BACKEND_ERROR_CODE,
            Self::Decode(_) => "ERR_DECODE",
            Self::Config(_) => "ERR_CONFIG",
        }
    }

    /// Business code of a synthetic backend error.
    pub fn backend_code(&self) -> Option<&str> {
        match self {
            Self::Backend(err) => err.code.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` for synthetic backend errors.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Returns `true` when the request was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{BackendError, RequestError, BACKEND_ERROR_CODE};

    #[test]
    fn backend_error_reports_sentinel_code() {
        let err = RequestError::Backend(BackendError {
            code: Some("B0003".to_owned()),
            message: Some("logged out".to_owned()),
            status: 200,
            body: json!({"code": "B0003", "msg": "logged out"}),
        });
        assert_eq!(err.code(), BACKEND_ERROR_CODE);
        assert_eq!(err.backend_code(), Some("B0003"));
        assert_eq!(err.to_string(), "the backend request error: logged out");
    }

    #[test]
    fn http_error_has_no_backend_code() {
        let err = RequestError::Http {
            status: 502,
            body: "bad gateway".to_owned(),
        };
        assert_eq!(err.code(), "ERR_BAD_RESPONSE");
        assert!(err.backend_code().is_none());
        assert!(!err.is_backend());
    }
}
