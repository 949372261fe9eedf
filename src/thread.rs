//! Conversation thread state
//!
//! A [`ConversationThread`] is the client-side copy of one conversation,
//! keyed by (companion id, session token). It is a cheap, clonable handle:
//! clones share the same state, so a chat view, a [`MessageDispatcher`] and
//! background tasks can all observe and update one thread.
//!
//! The thread tracks which pair is currently *active* (displayed). Network
//! results are applied only if their pair is still active when they
//! resolve; anything else is a stale response for a view that has moved on
//! and is dropped.
//!
//! # Ordering
//!
//! Authoritative sequences (from [`ConversationThread::load`] and
//! [`ConversationThread::reconcile`]) go through the same normalization:
//! a stable sort by timestamp followed by removal of repeated ids. Local
//! appends never move backwards in time.
//!
//! A load replaces the sequence with the server's copy but keeps a pending
//! message whose send is still in flight. A load that resolves after a send
//! has already applied its result is superseded and reported as stale.
//!
//! [`MessageDispatcher`]: crate::dispatcher::MessageDispatcher

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::CompanionApi;
use crate::error::{ConfidantError, Result};
use crate::message::{DeliveryState, Message};

/// Identifies one conversation: a companion and the visitor's session token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadKey {
    /// Companion identifier used by the chat endpoints
    pub companion_id: String,
    /// Anonymous session token
    pub session_token: String,
}

impl ThreadKey {
    /// Creates a key
    pub fn new(companion_id: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            companion_id: companion_id.into(),
            session_token: session_token.into(),
        }
    }
}

/// View-level lifecycle of the active thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadStatus {
    /// No thread is open
    Idle,
    /// History is being fetched
    Loading,
    /// History is loaded and the thread accepts sends
    Ready,
    /// History could not be fetched; no messages are shown
    LoadFailed(String),
}

/// Result of a [`ConversationThread::load`]
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The history replaced the local sequence
    Loaded(Vec<Message>),
    /// Another thread became active, or a send applied a newer result,
    /// before the response arrived; nothing changed
    Stale,
}

#[derive(Debug)]
struct ThreadState {
    active: Option<ThreadKey>,
    status: ThreadStatus,
    messages: Vec<Message>,
    // Bumped whenever a send result is applied
    revision: u64,
}

/// Shared handle to the client-side conversation thread
#[derive(Debug, Clone)]
pub struct ConversationThread {
    api: Arc<dyn CompanionApi>,
    state: Arc<Mutex<ThreadState>>,
}

impl ConversationThread {
    /// Creates an idle thread that loads history through `api`
    pub fn new(api: Arc<dyn CompanionApi>) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(ThreadState {
                active: None,
                status: ThreadStatus::Idle,
                messages: Vec::new(),
                revision: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ThreadState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes `(companion_id, session_token)` the active thread
    ///
    /// Clears the local sequence when the pair changes. Any response still
    /// in flight for the previous pair will be discarded.
    pub fn open(&self, companion_id: &str, session_token: &str) {
        let key = ThreadKey::new(companion_id, session_token);
        let mut state = self.state();
        if state.active.as_ref() != Some(&key) {
            tracing::debug!("Opening thread for companion {}", companion_id);
            state.messages.clear();
            state.status = ThreadStatus::Ready;
            state.active = Some(key);
        }
    }

    /// Closes the active thread
    ///
    /// The local sequence is discarded and every response that resolves
    /// afterwards is ignored.
    pub fn close(&self) {
        let mut state = self.state();
        if let Some(key) = state.active.take() {
            tracing::debug!("Closing thread for companion {}", key.companion_id);
        }
        state.messages.clear();
        state.status = ThreadStatus::Idle;
    }

    /// Loads the authoritative history and replaces the local sequence
    ///
    /// The pair becomes the active thread when the request is issued. If a
    /// different pair is active when the response arrives, or a send for
    /// the pair applied its result in the meantime, the response is
    /// discarded and [`LoadOutcome::Stale`] is returned. A pending message
    /// the server does not know about yet is kept at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`ConfidantError::ThreadLoad`] when the fetch fails. The
    /// local sequence is left empty and the status becomes
    /// [`ThreadStatus::LoadFailed`].
    pub async fn load(&self, companion_id: &str, session_token: &str) -> Result<LoadOutcome> {
        let key = ThreadKey::new(companion_id, session_token);
        let issued_at = {
            let mut state = self.state();
            if state.active.as_ref() != Some(&key) {
                state.messages.clear();
                state.active = Some(key.clone());
            }
            state.status = ThreadStatus::Loading;
            state.revision
        };

        let result = self.api.load_thread(companion_id, session_token).await;

        let mut state = self.state();
        if state.active.as_ref() != Some(&key) {
            tracing::debug!(
                "Discarding history for companion {}: view moved on",
                companion_id
            );
            return Ok(LoadOutcome::Stale);
        }
        if state.revision != issued_at {
            tracing::debug!(
                "Discarding history for companion {}: superseded by a send",
                companion_id
            );
            state.status = ThreadStatus::Ready;
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(messages) => {
                let pending = state.messages.iter().find(|m| m.is_pending()).cloned();
                let mut messages = normalize(messages);
                if let Some(pending) = pending {
                    if !messages.iter().any(|m| m.id == pending.id) {
                        append_unchecked(&mut messages, pending);
                    }
                }
                tracing::debug!(
                    "Loaded {} messages for companion {}",
                    messages.len(),
                    companion_id
                );
                state.messages = messages.clone();
                state.status = ThreadStatus::Ready;
                Ok(LoadOutcome::Loaded(messages))
            }
            Err(e) => {
                tracing::warn!("Failed to load thread for {}: {}", companion_id, e);
                let message = match e.downcast_ref::<ConfidantError>() {
                    Some(ConfidantError::ThreadLoad { message, .. }) => message.clone(),
                    _ => e.to_string(),
                };
                state.messages.clear();
                state.status = ThreadStatus::LoadFailed(message.clone());
                Err(ConfidantError::ThreadLoad {
                    companion_id: companion_id.to_string(),
                    message,
                }
                .into())
            }
        }
    }

    /// Appends a message to the tail of the active thread
    ///
    /// A timestamp older than the current tail is raised to the tail's
    /// timestamp.
    ///
    /// # Errors
    ///
    /// - [`ConfidantError::ThreadNotOpen`] if no thread is active
    /// - [`ConfidantError::DuplicateMessage`] if the id is already present
    /// - [`ConfidantError::PendingMessageExists`] if `message` is pending
    ///   and the thread already holds a pending message
    pub fn append(&self, message: Message) -> Result<()> {
        let mut state = self.state();
        if state.active.is_none() {
            return Err(ConfidantError::ThreadNotOpen(String::new()).into());
        }
        push_message(&mut state.messages, message)
    }

    /// Replaces the local sequence with the authoritative thread returned by
    /// a successful send
    ///
    /// The transient pending entry is superseded by the server's confirmed
    /// copy, so the result is exactly what a fresh [`Self::load`] would
    /// produce.
    ///
    /// # Errors
    ///
    /// Returns [`ConfidantError::ThreadNotOpen`] if no thread is active
    pub fn reconcile(&self, server_thread: Vec<Message>) -> Result<()> {
        let mut state = self.state();
        if state.active.is_none() {
            return Err(ConfidantError::ThreadNotOpen(String::new()).into());
        }
        apply_server_thread(&mut state, server_thread);
        Ok(())
    }

    /// [`Self::reconcile`] for a send that may resolve after the view moved on
    ///
    /// Returns false, leaving the thread untouched, when `key` is no longer
    /// the active thread.
    pub fn reconcile_if_active(&self, key: &ThreadKey, server_thread: Vec<Message>) -> bool {
        let mut state = self.state();
        if state.active.as_ref() != Some(key) {
            return false;
        }
        apply_server_thread(&mut state, server_thread);
        true
    }

    /// Marks a pending message as failed
    ///
    /// # Errors
    ///
    /// Returns [`ConfidantError::MessageNotFound`] if no message has this id
    /// or it is not pending
    pub fn fail(&self, message_id: &str) -> Result<()> {
        let mut state = self.state();
        mark_failed(&mut state.messages, message_id)
    }

    /// Records a failed send on the active thread
    ///
    /// `attempted` is marked failed. If it is no longer in the sequence (a
    /// load replaced it while the send was in flight) it is re-appended as
    /// failed. `notice` is then appended after it. Returns false, leaving
    /// the thread untouched, when `key` is no longer the active thread.
    pub fn fail_if_active(&self, key: &ThreadKey, attempted: &Message, notice: Message) -> bool {
        let mut state = self.state();
        if state.active.as_ref() != Some(key) {
            return false;
        }
        let messages = &mut state.messages;
        match messages.iter().position(|m| m.id == attempted.id) {
            Some(index) => {
                if messages[index].is_pending() {
                    messages[index].delivery_state = Some(DeliveryState::Failed);
                }
            }
            None => {
                let mut failed = attempted.clone();
                failed.delivery_state = Some(DeliveryState::Failed);
                append_unchecked(messages, failed);
            }
        }
        append_unchecked(messages, notice);
        state.revision += 1;
        true
    }

    /// Runs `f` on the message list only if `key` is the active thread
    ///
    /// Returns `None` when another thread is active (or none is), letting
    /// callers that resolve late skip their mutation.
    pub(crate) fn with_active<R>(
        &self,
        key: &ThreadKey,
        f: impl FnOnce(&mut Vec<Message>) -> R,
    ) -> Option<R> {
        let mut state = self.state();
        if state.active.as_ref() != Some(key) {
            return None;
        }
        Some(f(&mut state.messages))
    }

    /// Returns true when `key` is the active thread
    pub fn is_active(&self, key: &ThreadKey) -> bool {
        self.state().active.as_ref() == Some(key)
    }

    /// Snapshot of the message sequence
    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    /// Current lifecycle status
    pub fn status(&self) -> ThreadStatus {
        self.state().status.clone()
    }

    /// Key of the active thread, if any
    pub fn active(&self) -> Option<ThreadKey> {
        self.state().active.clone()
    }

    /// Companion id of the active thread, if any
    pub fn active_companion(&self) -> Option<String> {
        self.state().active.as_ref().map(|k| k.companion_id.clone())
    }

    /// The pending message, if a send is in progress
    pub fn pending(&self) -> Option<Message> {
        self.state().messages.iter().find(|m| m.is_pending()).cloned()
    }

    /// Number of messages in the local sequence
    pub fn len(&self) -> usize {
        self.state().messages.len()
    }

    /// Returns true when the local sequence is empty
    pub fn is_empty(&self) -> bool {
        self.state().messages.is_empty()
    }
}

/// Sorts by timestamp (stable) and drops repeated ids, keeping the first
pub(crate) fn normalize(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by_key(|m| m.timestamp);
    let mut seen = HashSet::new();
    messages.retain(|m| seen.insert(m.id.clone()));
    messages
}

fn apply_server_thread(state: &mut ThreadState, server_thread: Vec<Message>) {
    state.messages = normalize(server_thread);
    state.status = ThreadStatus::Ready;
    state.revision += 1;
}

pub(crate) fn push_message(messages: &mut Vec<Message>, message: Message) -> Result<()> {
    if messages.iter().any(|m| m.id == message.id) {
        return Err(ConfidantError::DuplicateMessage(message.id).into());
    }
    if message.is_pending() {
        if let Some(pending) = messages.iter().find(|m| m.is_pending()) {
            return Err(ConfidantError::PendingMessageExists(pending.id.clone()).into());
        }
    }
    append_unchecked(messages, message);
    Ok(())
}

/// Tail insert that only enforces monotonic timestamps
fn append_unchecked(messages: &mut Vec<Message>, mut message: Message) {
    if let Some(last) = messages.last() {
        if message.timestamp < last.timestamp {
            message.timestamp = last.timestamp;
        }
    }
    messages.push(message);
}

pub(crate) fn mark_failed(messages: &mut [Message], message_id: &str) -> Result<()> {
    match messages
        .iter_mut()
        .find(|m| m.id == message_id && m.is_pending())
    {
        Some(message) => {
            message.delivery_state = Some(DeliveryState::Failed);
            Ok(())
        }
        None => Err(ConfidantError::MessageNotFound(message_id.to_string()).into()),
    }
}
