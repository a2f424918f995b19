use std::{fmt, future::Future, pin::Pin, sync::Arc, time::Duration};

use reqwest::StatusCode;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use crate::{
    classify::is_http_success,
    registry::{CancellationRegistry, REQUEST_ID_HEADER},
    BackendError, ClientOptions, Payload, RawResponse, RefreshState, RequestDescriptor,
    RequestError, RequestHooks, RequestId, Result, RetryPolicy,
};

/// Boxed future returned by [`Dispatcher::submit`].
pub type SubmitFuture<'a> = Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'a>>;

enum Attempt {
    Received(RawResponse),
    Status { status: StatusCode, body: String },
    Failed(reqwest::Error),
}

/// Dispatch core shared by both client variants.
///
/// Owns the HTTP client, the hooks, the cancellation registry and the
/// refresh state of one backend flavor.
pub struct Dispatcher {
    http: reqwest::Client,
    base_url: String,
    options: ClientOptions,
    retry: RetryPolicy,
    hooks: Arc<dyn RequestHooks>,
    registry: CancellationRegistry,
    state: RefreshState,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .field("in_flight", &self.registry.len())
            .finish()
    }
}

impl Dispatcher {
    pub(crate) fn new(
        base_url: String,
        hooks: Arc<dyn RequestHooks>,
        options: ClientOptions,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            retry: RetryPolicy::from_options(&options),
            options,
            hooks,
            registry: CancellationRegistry::new(),
            state: RefreshState::new(),
        }
    }

    /// Same base URL and hooks with different options and fresh state.
    pub(crate) fn reconfigure(&self, options: ClientOptions) -> Self {
        Self::new(self.base_url.clone(), Arc::clone(&self.hooks), options)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    pub fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    /// Runs `descriptor` through the full hook chain.
    ///
    /// Resolves with the transport response once it is classified as a
    /// success or recovered by `on_backend_fail`.
    pub fn submit(&self, descriptor: RequestDescriptor) -> SubmitFuture<'_> {
        Box::pin(self.dispatch(descriptor))
    }

    /// Maps a settled response to the caller's value.
    pub(crate) fn finish(&self, response: RawResponse) -> Payload {
        if response.request.response_type.is_json() {
            Payload::Json(self.hooks.transform_backend_response(response))
        } else {
            response.body
        }
    }

    /// Hands a failure raised after dispatch to `on_error`.
    pub(crate) async fn report(&self, err: &RequestError) {
        self.hooks.on_error(err, self).await;
    }

    async fn dispatch(&self, mut descriptor: RequestDescriptor) -> Result<RawResponse> {
        let request_id = RequestId::generate();
        descriptor.set_header(REQUEST_ID_HEADER, request_id.as_str());
        descriptor.request_id = Some(request_id.clone());

        // Caller-supplied signals stay out of the registry.
        let _entry = match descriptor.signal {
            Some(_) => None,
            None => {
                let entry = self.registry.register(request_id.clone());
                descriptor.signal = Some(entry.token().clone());
                Some(entry)
            }
        };

        let descriptor = self.hooks.on_request(descriptor).await;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            request_id = %request_id,
            method = %descriptor.method,
            url = %descriptor.url,
            "dispatching request"
        );

        let response = match self.send_with_retry(descriptor, &request_id).await {
            Ok(response) => response,
            Err(err) => {
                self.hooks.on_error(&err, self).await;
                return Err(err);
            }
        };

        if !response.request.response_type.is_json() || self.hooks.is_backend_success(&response) {
            return Ok(response);
        }

        if let Some(recovered) = self.hooks.on_backend_fail(&response, self).await? {
            return Ok(recovered);
        }

        let err = RequestError::Backend(self.backend_error(&response));
        self.hooks.on_error(&err, self).await;
        Err(err)
    }

    fn backend_error(&self, response: &RawResponse) -> BackendError {
        let body = response.json();
        let envelope = self.hooks.envelope();
        BackendError {
            code: envelope.and_then(|format| format.code(body)),
            message: envelope.and_then(|format| format.message(body)),
            status: response.status,
            body: body.clone(),
        }
    }

    async fn send_with_retry(
        &self,
        descriptor: RequestDescriptor,
        request_id: &RequestId,
    ) -> Result<RawResponse> {
        let signal = descriptor.signal.clone().unwrap_or_default();
        let cancelled = || RequestError::Cancelled {
            request_id: request_id.clone(),
        };

        let mut attempt = 0usize;
        loop {
            if signal.is_cancelled() {
                return Err(cancelled());
            }

            let outcome = tokio::select! {
                biased;
                _ = signal.cancelled() => return Err(cancelled()),
                outcome = self.attempt(descriptor.clone(), request_id) => outcome,
            };

            match outcome? {
                Attempt::Received(response) => return Ok(response),
                Attempt::Status { status, body } => {
                    if self.retry.should_retry_status(&descriptor.method, status)
                        && self.retry.allows(attempt)
                    {
                        self.wait_before_retry(attempt, &signal).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(RequestError::Http {
                        status: status.as_u16(),
                        body,
                    });
                }
                Attempt::Failed(err) => {
                    if self.retry.should_retry_transport(&descriptor.method, &err)
                        && self.retry.allows(attempt)
                    {
                        self.wait_before_retry(attempt, &signal).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(RequestError::Transport(err));
                }
            }
        }
    }

    async fn attempt(&self, descriptor: RequestDescriptor, request_id: &RequestId) -> Result<Attempt> {
        let response = match self.build(&descriptor).send().await {
            Ok(response) => response,
            Err(err) => return Ok(Attempt::Failed(err)),
        };

        let status = response.status();
        if !is_http_success(status.as_u16()) {
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => return Ok(Attempt::Failed(err)),
            };
            return Ok(Attempt::Status { status, body });
        }

        let headers = response.headers().clone();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return Ok(Attempt::Failed(err)),
        };
        let body = decode_body(&descriptor, &bytes)?;

        Ok(Attempt::Received(RawResponse {
            status: status.as_u16(),
            headers,
            body,
            request: descriptor,
            request_id: request_id.clone(),
        }))
    }

    fn build(&self, descriptor: &RequestDescriptor) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(descriptor.method.clone(), self.resolve_url(&descriptor.url))
            .timeout(Duration::from_millis(self.options.timeout_ms));

        for (name, value) in &self.options.default_headers {
            if descriptor.header_value(name).is_none() {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        for (name, value) in &descriptor.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !descriptor.query.is_empty() {
            builder = builder.query(&descriptor.query);
        }
        if let Some(body) = &descriptor.body {
            builder = builder.json(body);
        }
        builder
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") || self.base_url.is_empty() {
            return url.to_owned();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }

    /// Exponential backoff; returns early when the request is cancelled.
    async fn wait_before_retry(&self, attempt: usize, signal: &CancellationToken) {
        let delay = self.retry.delay(attempt);

        #[cfg(feature = "tracing")]
        tracing::debug!("retrying request after {} ms", delay.as_millis());

        tokio::select! {
            _ = signal.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

fn decode_body(descriptor: &RequestDescriptor, bytes: &[u8]) -> Result<Payload> {
    if descriptor.response_type.is_json() {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Payload::Json(JsonValue::Null));
        }
        return serde_json::from_slice(bytes).map(Payload::Json).map_err(|err| {
            RequestError::Decode(format!(
                "invalid JSON response: {err}; body: {}",
                String::from_utf8_lossy(bytes)
            ))
        });
    }
    if descriptor.response_type.is_textual() {
        return Ok(Payload::Text(String::from_utf8_lossy(bytes).into_owned()));
    }
    Ok(Payload::Bytes(bytes.to_vec()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{decode_body, Dispatcher};
    use crate::{ClientOptions, DefaultHooks, Payload, RequestDescriptor, ResponseType};

    fn dispatcher(base_url: &str) -> Dispatcher {
        Dispatcher::new(
            base_url.to_owned(),
            Arc::new(DefaultHooks),
            ClientOptions::default(),
        )
    }

    #[test]
    fn resolve_url_joins_relative_paths() {
        let core = dispatcher("http://api.local/v1/");
        assert_eq!(core.resolve_url("/user/login"), "http://api.local/v1/user/login");
        assert_eq!(core.resolve_url("user/login"), "http://api.local/v1/user/login");
        assert_eq!(core.resolve_url("https://other/x"), "https://other/x");
        assert_eq!(dispatcher("").resolve_url("/x"), "/x");
    }

    #[test]
    fn decode_body_follows_declared_shape() {
        let json = RequestDescriptor::get("/a");
        assert_eq!(
            decode_body(&json, br#"{"code":"0000"}"#).expect("valid json"),
            Payload::Json(json!({"code": "0000"}))
        );
        assert_eq!(
            decode_body(&json, b"").expect("empty body"),
            Payload::Json(serde_json::Value::Null)
        );
        assert!(decode_body(&json, b"<html>").is_err());

        let text = RequestDescriptor::get("/a").response_type(ResponseType::Document);
        assert_eq!(
            decode_body(&text, b"<html>").expect("text"),
            Payload::Text("<html>".to_owned())
        );

        let blob = RequestDescriptor::get("/a").response_type(ResponseType::Blob);
        assert_eq!(
            decode_body(&blob, &[0, 159]).expect("bytes"),
            Payload::Bytes(vec![0, 159])
        );
    }

    #[test]
    fn debug_reports_in_flight_count() {
        let debug = format!("{:?}", dispatcher("http://api.local"));
        assert!(debug.contains("in_flight: 0"));
    }
}
