use reqwest::Method;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use crate::{RequestError, RequestId, Result};

/// Declared shape of a response body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// Structured data; the only shape subject to backend classification.
    #[default]
    Json,
    Blob,
    Text,
    ArrayBuffer,
    Stream,
    Document,
}

impl ResponseType {
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Whether the body is delivered as text rather than bytes.
    pub(crate) fn is_textual(self) -> bool {
        matches!(self, Self::Text | Self::Document)
    }
}

/// Input to a single request attempt.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Absolute URL, or a path joined onto the client's base URL.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    pub response_type: ResponseType,
    pub(crate) signal: Option<CancellationToken>,
    pub(crate) request_id: Option<RequestId>,
    /// Set on the copy sent again after a token refresh.
    pub(crate) resubmitted: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            response_type: ResponseType::Json,
            signal: None,
            request_id: None,
            resubmitted: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Sets a header, replacing any existing value with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Serializes `body` as the JSON request body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|err| RequestError::Decode(format!("request body is not JSON: {err}")))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn json_value(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Uses a caller-owned cancellation signal.
    ///
    /// Requests with their own signal are not tracked by the client's
    /// cancellation registry.
    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn signal(&self) -> Option<&CancellationToken> {
        self.signal.as_ref()
    }

    /// Id assigned when the descriptor was dispatched.
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Whether this descriptor is a resubmission after a token refresh.
    pub fn is_resubmitted(&self) -> bool {
        self.resubmitted
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove_header(&name);
        self.headers.push((name, value.into()));
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RequestDescriptor, ResponseType};

    #[test]
    fn header_replaces_case_insensitively() {
        let desc = RequestDescriptor::get("/a")
            .header("Authorization", "Bearer T1")
            .header("authorization", "Bearer T2");
        assert_eq!(desc.headers.len(), 1);
        assert_eq!(desc.header_value("AUTHORIZATION"), Some("Bearer T2"));
    }

    #[test]
    fn json_body_and_default_shape() {
        let desc = RequestDescriptor::post("/user/login")
            .json(&json!({"userName": "a", "password": "b"}))
            .expect("body must serialize");
        assert_eq!(desc.body, Some(json!({"userName": "a", "password": "b"})));
        assert_eq!(desc.response_type, ResponseType::Json);
        assert!(desc.request_id().is_none());
    }
}
