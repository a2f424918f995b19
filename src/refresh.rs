//! Hook set for backends that authenticate with refreshable bearer tokens.
//!
//! [`TokenRefreshCoordinator`] injects the stored access token, classifies
//! envelopes, and reacts to backend codes:
//!
//! - logout codes clear the session and fail the call quietly;
//! - modal-logout codes queue the message once and arm a deferred logout;
//! - expired-token codes trigger a single refresh and resubmit the stalled
//!   request with the new token.
//!
//! Only the request that started a refresh is resubmitted. Requests that hit
//! an expired-token code while a refresh is running fail with a synthetic
//! backend error.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::Value as JsonValue;

use crate::{
    auth::{clear_auth_storage, store_tokens, REFRESH_TOKEN_KEY, TOKEN_KEY},
    AuthStateOwner, CodeSet, CredentialStore, Dispatcher, EnvelopeFormat, RawResponse,
    RefreshState, RequestDescriptor, RequestError, RequestHooks, Result,
};

/// Receives error messages that should be shown to the user.
pub type MessageSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Codes and limits driving [`TokenRefreshCoordinator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub envelope: EnvelopeFormat,
    pub logout_codes: CodeSet,
    pub modal_logout_codes: CodeSet,
    pub expired_token_codes: CodeSet,
    /// Upper bound for one refresh call in milliseconds.
    pub refresh_timeout_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            envelope: EnvelopeFormat::default(),
            logout_codes: CodeSet::default(),
            modal_logout_codes: CodeSet::default(),
            expired_token_codes: CodeSet::default(),
            refresh_timeout_ms: 10_000,
        }
    }
}

impl CoordinatorConfig {
    /// Whether errors with `code` are kept away from the user.
    fn is_silent(&self, code: &str) -> bool {
        self.logout_codes.contains(code)
            || self.modal_logout_codes.contains(code)
            || self.expired_token_codes.contains(code)
    }
}

/// Bearer-token hooks with logout handling and single-flight refresh.
pub struct TokenRefreshCoordinator {
    config: CoordinatorConfig,
    store: Arc<dyn CredentialStore>,
    auth: Arc<dyn AuthStateOwner>,
    sink: Option<MessageSink>,
}

impl fmt::Debug for TokenRefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefreshCoordinator")
            .field("config", &self.config)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl TokenRefreshCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        store: Arc<dyn CredentialStore>,
        auth: Arc<dyn AuthStateOwner>,
    ) -> Self {
        Self {
            config,
            store,
            auth,
            sink: None,
        }
    }

    /// Forwards displayed error messages to `sink`.
    pub fn with_message_sink(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Runs the logout armed by a modal-logout code, at most once per arming.
    ///
    /// The messages that armed it leave the pending list, so the same
    /// message arms a new logout next time. Returns whether a logout was
    /// performed.
    pub async fn run_deferred_logout(&self, state: &RefreshState) -> bool {
        if !state.take_logout() {
            return false;
        }
        self.logout().await;
        true
    }

    async fn logout(&self) {
        #[cfg(feature = "tracing")]
        tracing::warn!("clearing session after backend logout code");

        clear_auth_storage(self.store.as_ref());
        self.auth.reset_store().await;
    }

    /// Exchanges the stored refresh token; `None` after a forced logout.
    async fn refresh_credentials(&self) -> Option<String> {
        let refresh_token = self.store.get(REFRESH_TOKEN_KEY).unwrap_or_default();
        let limit = Duration::from_millis(self.config.refresh_timeout_ms);

        #[cfg(feature = "tracing")]
        tracing::debug!("refreshing access token");

        match tokio::time::timeout(limit, self.auth.refresh(&refresh_token)).await {
            Ok(Ok(tokens)) => {
                store_tokens(self.store.as_ref(), &tokens);

                #[cfg(feature = "tracing")]
                tracing::debug!("access token refreshed");

                Some(tokens.token)
            }
            Ok(Err(_err)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "token refresh failed");

                self.logout().await;
                None
            }
            Err(_elapsed) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(timeout_ms = self.config.refresh_timeout_ms, "token refresh timed out");

                self.logout().await;
                None
            }
        }
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }
}

#[async_trait]
impl RequestHooks for TokenRefreshCoordinator {
    async fn on_request(&self, mut descriptor: RequestDescriptor) -> RequestDescriptor {
        match self.store.get(TOKEN_KEY).filter(|token| !token.is_empty()) {
            Some(token) => descriptor.set_header(AUTHORIZATION.as_str(), Self::bearer(&token)),
            None => descriptor.remove_header(AUTHORIZATION.as_str()),
        }
        descriptor
    }

    fn is_backend_success(&self, response: &RawResponse) -> bool {
        self.config.envelope.is_success(response.json())
    }

    async fn on_backend_fail(
        &self,
        response: &RawResponse,
        dispatcher: &Dispatcher,
    ) -> Result<Option<RawResponse>> {
        let body = response.json();
        let code = self.config.envelope.code(body).unwrap_or_default();

        if self.config.logout_codes.contains(&code) {
            self.logout().await;
            return Ok(None);
        }

        if self.config.modal_logout_codes.contains(&code) {
            let message = self.config.envelope.message(body).unwrap_or_default();
            if dispatcher.state().push_message(message.as_str()) {
                dispatcher.state().arm_logout(&message);
            }
            return Ok(None);
        }

        if self.config.expired_token_codes.contains(&code) {
            // A fresh token that is rejected again ends the call.
            if response.request.is_resubmitted() {
                #[cfg(feature = "tracing")]
                tracing::debug!(request_id = %response.request_id, "refreshed token rejected");

                return Ok(None);
            }
            let Some(guard) = dispatcher.state().try_begin_refresh() else {
                #[cfg(feature = "tracing")]
                tracing::debug!(request_id = %response.request_id, "refresh already running");

                return Ok(None);
            };
            let token = self.refresh_credentials().await;
            drop(guard);

            if let Some(token) = token {
                let mut retry = response.request.clone();
                retry.resubmitted = true;
                retry.set_header(AUTHORIZATION.as_str(), Self::bearer(&token));
                return dispatcher.submit(retry).await.map(Some);
            }
        }

        Ok(None)
    }

    fn transform_backend_response(&self, response: RawResponse) -> JsonValue {
        self.config.envelope.data(response.json())
    }

    async fn on_error(&self, error: &RequestError, dispatcher: &Dispatcher) {
        let (message, code) = match error {
            RequestError::Backend(backend) => (
                backend.message.clone().unwrap_or_else(|| error.to_string()),
                backend.code.clone().unwrap_or_default(),
            ),
            other => (other.to_string(), String::new()),
        };

        if self.config.is_silent(&code) {
            return;
        }

        if dispatcher.state().push_message(message.as_str()) {
            #[cfg(feature = "tracing")]
            tracing::warn!(code = error.code(), %message, "request failed");

            if let Some(sink) = &self.sink {
                sink(&message);
            }
        }
    }

    fn envelope(&self) -> Option<&EnvelopeFormat> {
        Some(&self.config.envelope)
    }
}
