//! `backend-http` is an async request layer for JSON backends that wrap
//! their payloads in a business envelope.
//!
//! A client composes one dispatch core with a set of [`RequestHooks`]:
//! - [`RequestClient::request`] returns `Err` on any unrecovered failure
//! - [`FlatRequestClient::request`] always resolves to a [`RequestOutcome`]
//!
//! Every attempt gets a [`RequestId`] and, unless the caller supplied a
//! signal, a cancellation entry that lives until the call settles.
//! [`TokenRefreshCoordinator`] adds bearer-token injection, logout handling
//! and single-flight token refresh with transparent resubmission.

pub mod api;
mod auth;
mod classify;
mod client;
mod config;
mod descriptor;
mod dispatch;
mod error;
mod hooks;
mod options;
mod refresh;
mod registry;
mod response;
mod retry;
mod state;

pub use auth::{
    clear_auth_storage, store_tokens, AuthStateOwner, CredentialStore, MemoryCredentialStore,
    TokenPair, REFRESH_TOKEN_KEY, TOKEN_KEY,
};
pub use classify::{envelope_field, is_http_success, CodeSet, EnvelopeFormat};
pub use client::{FlatRequestClient, RequestClient, RequestOutcome};
pub use config::{AuthRouteMode, ServiceBaseUrls, ServiceConfig};
pub use descriptor::{RequestDescriptor, ResponseType};
pub use dispatch::{Dispatcher, SubmitFuture};
pub use error::{BackendError, RequestError, BACKEND_ERROR_CODE};
pub use hooks::{DefaultHooks, EnvelopeHooks, RequestHooks};
pub use options::ClientOptions;
pub use refresh::{CoordinatorConfig, MessageSink, TokenRefreshCoordinator};
pub use registry::{CancellationRegistry, RequestId, REQUEST_ID_HEADER};
pub use response::{Payload, RawResponse};
pub use retry::RetryPolicy;
pub use state::{RefreshGuard, RefreshState};

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, RequestError>;
