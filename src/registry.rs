//! Request identity and cancellation bookkeeping.
//!
//! Every dispatched attempt receives a fresh [`RequestId`]. Attempts that
//! arrive without their own cancellation signal get one from the
//! [`CancellationRegistry`], keyed by that id, for as long as the call is in
//! flight.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Header carrying the request id for server-side correlation.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Opaque unique id of one outbound attempt.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a new random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Maps in-flight request ids to their cancellation tokens.
#[derive(Clone, Debug, Default)]
pub struct CancellationRegistry {
    entries: Arc<Mutex<HashMap<RequestId, CancellationToken>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, CancellationToken>> {
        // Entries are plain tokens; a poisoned map is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a fresh token for `id`.
    ///
    /// The returned entry removes itself from the registry when dropped.
    pub(crate) fn register(&self, id: RequestId) -> RegistryEntry {
        let token = CancellationToken::new();
        self.lock().insert(id.clone(), token.clone());
        RegistryEntry {
            registry: self.clone(),
            id,
            token,
        }
    }

    /// Cancels the request registered under `id` and removes it.
    ///
    /// Unknown or already settled ids are ignored. Returns whether an entry
    /// was cancelled.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let token = self.lock().remove(id);
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every registered request and clears the registry.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<CancellationToken> = self.lock().drain().map(|(_, token)| token).collect();
        for token in &drained {
            token.cancel();
        }
        drained.len()
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.lock().contains_key(id)
    }

    /// Ids of every in-flight request, sorted.
    pub fn ids(&self) -> Vec<RequestId> {
        let mut ids: Vec<RequestId> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn remove(&self, id: &RequestId) {
        self.lock().remove(id);
    }
}

/// Registration of one in-flight request; unregisters on drop.
#[derive(Debug)]
pub(crate) struct RegistryEntry {
    registry: CancellationRegistry,
    id: RequestId,
    token: CancellationToken,
}

impl RegistryEntry {
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for RegistryEntry {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}
