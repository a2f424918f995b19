use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

/// Per-client refresh and error-display state.
///
/// One instance belongs to one dispatch core; clients for different backend
/// flavors never share it.
#[derive(Debug, Default)]
pub struct RefreshState {
    refreshing: AtomicBool,
    logout_armed: AtomicBool,
    pending_messages: Mutex<Vec<String>>,
    logout_messages: Mutex<Vec<String>>,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    /// Moves from idle to refreshing.
    ///
    /// Returns `None` when a refresh is already running. The flag returns to
    /// idle when the guard is dropped.
    pub fn try_begin_refresh(&self) -> Option<RefreshGuard<'_>> {
        self.refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RefreshGuard { state: self })
    }

    fn messages(&self) -> MutexGuard<'_, Vec<String>> {
        self.pending_messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends `message` unless it is already pending.
    pub fn push_message(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        let mut messages = self.messages();
        if messages.contains(&message) {
            return false;
        }
        messages.push(message);
        true
    }

    pub fn has_message(&self, message: &str) -> bool {
        self.messages().iter().any(|pending| pending == message)
    }

    /// Pending messages in insertion order.
    pub fn pending_messages(&self) -> Vec<String> {
        self.messages().clone()
    }

    pub fn remove_message(&self, message: &str) {
        self.messages().retain(|pending| pending != message);
    }

    pub fn clear_messages(&self) {
        self.messages().clear();
    }

    fn armed_by(&self) -> MutexGuard<'_, Vec<String>> {
        self.logout_messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arms the deferred logout for `message`; `true` only for the first caller.
    pub(crate) fn arm_logout(&self, message: &str) -> bool {
        {
            let mut armed_by = self.armed_by();
            if !armed_by.iter().any(|armed| armed == message) {
                armed_by.push(message.to_owned());
            }
        }
        !self.logout_armed.swap(true, Ordering::SeqCst)
    }

    /// Disarms the deferred logout; `true` if it was armed.
    ///
    /// Messages that armed it are dropped from the pending list.
    pub(crate) fn take_logout(&self) -> bool {
        if !self.logout_armed.swap(false, Ordering::SeqCst) {
            return false;
        }
        let armed_by = std::mem::take(&mut *self.armed_by());
        self.messages()
            .retain(|pending| !armed_by.iter().any(|armed| armed == pending));
        true
    }

    pub fn is_logout_pending(&self) -> bool {
        self.logout_armed.load(Ordering::SeqCst)
    }
}

/// Holds the refreshing flag; resets it on drop.
#[derive(Debug)]
pub struct RefreshGuard<'a> {
    state: &'a RefreshState,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.state.refreshing.store(false, Ordering::SeqCst);
    }
}
