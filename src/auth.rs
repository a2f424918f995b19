//! Credential storage and auth-state collaborators.

use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Storage key of the access token.
pub const TOKEN_KEY: &str = "token";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Access and refresh token pair issued by the auth backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Key-value store holding credentials. The request layer only reads and
/// updates it; the store owns the values.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Stores a freshly issued token pair.
pub fn store_tokens(store: &dyn CredentialStore, tokens: &TokenPair) {
    store.set(TOKEN_KEY, &tokens.token);
    store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token);
}

/// Removes both tokens.
pub fn clear_auth_storage(store: &dyn CredentialStore) {
    store.remove(TOKEN_KEY);
    store.remove(REFRESH_TOKEN_KEY);
}

/// Process-local credential store with an optional key prefix.
#[derive(Default)]
pub struct MemoryCredentialStore {
    prefix: String,
    values: Mutex<HashMap<String, String>>,
}

impl fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("prefix", &self.prefix)
            .field("keys", &self.lock().len())
            .finish()
    }
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            values: Mutex::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(&self.key(key)).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock().insert(self.key(key), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.lock().remove(&self.key(key));
    }
}

/// Owner of the signed-in state.
#[async_trait]
pub trait AuthStateOwner: Send + Sync {
    /// Clears signed-in state after a logout.
    async fn reset_store(&self);

    /// Exchanges a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;
}

#[cfg(test)]
mod tests {
    use super::{
        clear_auth_storage, store_tokens, CredentialStore, MemoryCredentialStore, TokenPair,
        REFRESH_TOKEN_KEY, TOKEN_KEY,
    };

    #[test]
    fn prefixed_store_round_trips_tokens() {
        let store = MemoryCredentialStore::with_prefix("admin_");
        store_tokens(
            &store,
            &TokenPair {
                token: "T1".to_owned(),
                refresh_token: "R1".to_owned(),
            },
        );
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("T1"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));

        clear_auth_storage(&store);
        assert!(store.get(TOKEN_KEY).is_none());
        assert!(store.get(REFRESH_TOKEN_KEY).is_none());
    }

    #[test]
    fn token_pair_uses_camel_case_and_redacts_debug() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"token":"T2","refreshToken":"R2"}"#).expect("valid pair");
        assert_eq!(pair.refresh_token, "R2");
        let debug = format!("{pair:?}");
        assert!(!debug.contains("T2"));
    }
}
