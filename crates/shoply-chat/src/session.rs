//! Per-session conversation memory.
//!
//! The store owns one ordered message history per session id. Histories are
//! created on first reference and live until the store is dropped; there is
//! no eviction, size cap, or persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shoply_core::{Message, Role};

// =============================================================================
// MessageHistory
// =============================================================================

/// Shared handle to one session's ordered history.
///
/// Clones point at the same underlying sequence, so a message appended
/// through one handle is visible through every other handle for that
/// session.
#[derive(Debug, Clone, Default)]
pub struct MessageHistory {
    inner: Arc<Mutex<Vec<Message>>>,
}

impl MessageHistory {
    pub fn add_user_message(&self, content: impl Into<String>) {
        self.lock().push(Message::user(content));
    }

    pub fn add_assistant_message(&self, content: impl Into<String>) {
        self.lock().push(Message::assistant(content));
    }

    /// Append a user message and the assistant reply as one step.
    pub fn add_exchange(&self, user: impl Into<String>, assistant: impl Into<String>) {
        let mut messages = self.lock();
        messages.push(Message::user(user));
        messages.push(Message::assistant(assistant));
    }

    /// Snapshot of the history in append order.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether both handles refer to the same session history.
    #[cfg(test)]
    pub(crate) fn same_as(&self, other: &MessageHistory) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // A panic while holding the lock cannot leave a Vec half-pushed.
    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// SessionStore
// =============================================================================

/// Process-lifetime map of session id to message history.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, MessageHistory>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the history for `session_id`, creating an empty one on first use.
    pub fn get_or_create(&self, session_id: &str) -> MessageHistory {
        let mut sessions = self.lock();
        if let Some(history) = sessions.get(session_id) {
            return history.clone();
        }
        tracing::debug!(session_id, "Session created");
        let history = MessageHistory::default();
        sessions.insert(session_id.to_string(), history.clone());
        history
    }

    pub fn append_user(&self, session_id: &str, text: impl Into<String>) {
        self.get_or_create(session_id).add_user_message(text);
    }

    pub fn append_assistant(&self, session_id: &str, text: impl Into<String>) {
        self.get_or_create(session_id).add_assistant_message(text);
    }

    /// Snapshot of a session's messages; empty for an unknown session.
    ///
    /// Does not create the session.
    pub fn history(&self, session_id: &str) -> Vec<Message> {
        self.lock()
            .get(session_id)
            .map(MessageHistory::messages)
            .unwrap_or_default()
    }

    /// Number of messages with the given role in a session.
    pub fn count_role(&self, session_id: &str, role: Role) -> usize {
        self.history(session_id)
            .iter()
            .filter(|m| m.role == role)
            .count()
    }

    /// Ids of all sessions created so far, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MessageHistory>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Tests
// =============================================================================
