use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::{Dispatcher, EnvelopeFormat, RawResponse, RequestDescriptor, RequestError, Result};

/// Lifecycle hooks applied by the dispatch core.
///
/// Per call they run in order: `on_request`, transport,
/// `is_backend_success`, then `transform_backend_response` or
/// `on_backend_fail`, and `on_error` on failure only. Every method has a
/// default, so implementors override only what their backend needs.
#[async_trait]
pub trait RequestHooks: Send + Sync {
    /// Adjusts the outgoing descriptor. Default: unchanged.
    async fn on_request(&self, descriptor: RequestDescriptor) -> RequestDescriptor {
        descriptor
    }

    /// Whether the envelope reports success. Default: always.
    fn is_backend_success(&self, _response: &RawResponse) -> bool {
        true
    }

    /// Recovers from a backend failure.
    ///
    /// Returning `Ok(Some(response))` makes that response the result of the
    /// call; `Ok(None)` fails the call with a synthetic backend error. The
    /// dispatcher can be used to resubmit a request through the full hook
    /// chain. Default: no recovery.
    async fn on_backend_fail(
        &self,
        _response: &RawResponse,
        _dispatcher: &Dispatcher,
    ) -> Result<Option<RawResponse>> {
        Ok(None)
    }

    /// Maps a successful envelope to the caller's value. Default: the body.
    fn transform_backend_response(&self, response: RawResponse) -> JsonValue {
        response.body.into_json().unwrap_or(JsonValue::Null)
    }

    /// Observes every unrecovered failure. Default: nothing.
    async fn on_error(&self, _error: &RequestError, _dispatcher: &Dispatcher) {}

    /// Envelope used to fill code and message of synthetic backend errors.
    fn envelope(&self) -> Option<&EnvelopeFormat> {
        None
    }
}

/// Hooks with every default behavior.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHooks;

impl RequestHooks for DefaultHooks {}

/// Hooks for a backend flavor without authentication: success and payload
/// come from the envelope, failures are not recovered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeHooks {
    envelope: EnvelopeFormat,
}

impl EnvelopeHooks {
    pub fn new(envelope: EnvelopeFormat) -> Self {
        Self { envelope }
    }
}

#[async_trait]
impl RequestHooks for EnvelopeHooks {
    fn is_backend_success(&self, response: &RawResponse) -> bool {
        self.envelope.is_success(response.json())
    }

    fn transform_backend_response(&self, response: RawResponse) -> JsonValue {
        self.envelope.data(response.json())
    }

    fn envelope(&self) -> Option<&EnvelopeFormat> {
        Some(&self.envelope)
    }
}
