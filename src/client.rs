use std::{fmt, sync::Arc};

use serde::de::DeserializeOwned;

use crate::{
    ClientOptions, DefaultHooks, Dispatcher, Payload, RefreshState, RequestDescriptor,
    RequestError, RequestHooks, RequestId, Result,
};

#[derive(Clone)]
/// Request client that returns `Err` on every unrecovered failure.
pub struct RequestClient {
    core: Arc<Dispatcher>,
}

impl fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClient")
            .field("core", &self.core)
            .finish()
    }
}

impl RequestClient {
    /// Creates a client for one backend flavor.
    ///
    /// Relative descriptor URLs are joined onto `base_url`.
    pub fn new(base_url: impl Into<String>, hooks: impl RequestHooks + 'static) -> Self {
        Self::from_shared_hooks(base_url, Arc::new(hooks))
    }

    pub fn from_shared_hooks(base_url: impl Into<String>, hooks: Arc<dyn RequestHooks>) -> Self {
        Self {
            core: Arc::new(Dispatcher::new(
                base_url.into(),
                hooks,
                ClientOptions::default(),
            )),
        }
    }

    /// Creates a client with default hooks: every response is a success
    /// and the body is returned unchanged.
    pub fn plain(base_url: impl Into<String>) -> Self {
        Self::new(base_url, DefaultHooks)
    }

    /// Applies client options such as timeout and retry behavior.
    ///
    /// Call before issuing requests: in-flight bookkeeping and refresh state
    /// start fresh.
    pub fn with_options(self, opts: ClientOptions) -> Self {
        Self {
            core: Arc::new(self.core.reconfigure(opts)),
        }
    }

    /// Sends a request and returns its value.
    ///
    /// Structured-data responses go through `transform_backend_response`;
    /// every other shape is returned as received.
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<Payload> {
        let response = self.core.submit(descriptor).await?;
        Ok(self.core.finish(response))
    }

    /// Sends a request and deserializes the transformed value into `T`.
    ///
    /// A value that does not fit `T` fails with [`RequestError::Decode`],
    /// which is also passed to `on_error`.
    pub async fn request_json<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T> {
        let payload = self.request(descriptor).await?;
        match payload.deserialize() {
            Ok(value) => Ok(value),
            Err(err) => {
                self.core.report(&err).await;
                Err(err)
            }
        }
    }

    /// Cancels an in-flight request; unknown ids are ignored.
    pub fn cancel_request(&self, id: &RequestId) -> bool {
        let cancelled = self.core.registry().cancel(id);

        #[cfg(feature = "tracing")]
        tracing::debug!(request_id = %id, cancelled, "cancel requested");

        cancelled
    }

    /// Cancels every request tracked by this client.
    pub fn cancel_all_requests(&self) -> usize {
        self.core.registry().cancel_all()
    }

    /// Ids of requests currently tracked for cancellation.
    pub fn in_flight(&self) -> Vec<RequestId> {
        self.core.registry().ids()
    }

    pub fn state(&self) -> &RefreshState {
        self.core.state()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.core
    }
}

/// Result of a flat request: exactly one of `data` and `error` is set.
#[derive(Debug)]
pub struct RequestOutcome<T> {
    pub data: Option<T>,
    pub error: Option<RequestError>,
}

impl<T> RequestOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<T> {
        match (self.data, self.error) {
            (_, Some(err)) => Err(err),
            (Some(data), None) => Ok(data),
            (None, None) => Err(RequestError::Decode("outcome carries no data".to_owned())),
        }
    }
}

impl<T> From<Result<T>> for RequestOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self {
                data: Some(data),
                error: None,
            },
            Err(err) => Self {
                data: None,
                error: Some(err),
            },
        }
    }
}

#[derive(Clone, Debug)]
/// Request client that never fails: every call resolves to a
/// [`RequestOutcome`].
pub struct FlatRequestClient {
    inner: RequestClient,
}

impl FlatRequestClient {
    pub fn new(base_url: impl Into<String>, hooks: impl RequestHooks + 'static) -> Self {
        RequestClient::new(base_url, hooks).into()
    }

    pub fn with_options(self, opts: ClientOptions) -> Self {
        self.inner.with_options(opts).into()
    }

    pub async fn request(&self, descriptor: RequestDescriptor) -> RequestOutcome<Payload> {
        self.inner.request(descriptor).await.into()
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> RequestOutcome<T> {
        self.inner.request_json(descriptor).await.into()
    }

    pub fn cancel_request(&self, id: &RequestId) -> bool {
        self.inner.cancel_request(id)
    }

    pub fn cancel_all_requests(&self) -> usize {
        self.inner.cancel_all_requests()
    }

    pub fn in_flight(&self) -> Vec<RequestId> {
        self.inner.in_flight()
    }

    pub fn state(&self) -> &RefreshState {
        self.inner.state()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.inner.dispatcher()
    }

    /// The throwing client sharing this client's dispatch core.
    pub fn throwing(&self) -> &RequestClient {
        &self.inner
    }
}

impl From<RequestClient> for FlatRequestClient {
    fn from(inner: RequestClient) -> Self {
        Self { inner }
    }
}
