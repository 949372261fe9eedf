//! Sending user messages
//!
//! [`MessageDispatcher::send`] is the only path that writes user input to a
//! [`ConversationThread`]. Each send is optimistic: the text shows up in the
//! thread immediately as a `pending` user message, then either
//!
//! - the server's full thread replaces the local one (`Delivered`), or
//! - the pending message is marked `failed` and an apology from the system
//!   follows it (`Failed`).
//!
//! At most one send per (companion, session) pair is in flight. The guard is
//! an RAII value, so it is released whether the send future completes,
//! fails or is dropped mid-request.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use metrics::increment_counter;

use crate::api::{ChatRequest, CompanionApi};
use crate::config::ChatConfig;
use crate::error::{ConfidantError, Result};
use crate::message::Message;
use crate::thread::{push_message, ConversationThread, ThreadKey};

/// How a [`MessageDispatcher::send`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server accepted the message; the thread now mirrors the server
    Delivered {
        /// Companion reply text, when the server included one
        reply: Option<String>,
    },
    /// The request failed; the user message is marked failed
    Failed {
        /// Transport or HTTP failure description
        reason: String,
    },
    /// The view switched threads before the response arrived; nothing was
    /// applied
    Discarded,
}

impl SendOutcome {
    fn label(&self) -> &'static str {
        match self {
            SendOutcome::Delivered { .. } => "delivered",
            SendOutcome::Failed { .. } => "failed",
            SendOutcome::Discarded => "discarded",
        }
    }
}

/// Set of (companion, session) pairs with a send in flight
#[derive(Debug, Clone, Default)]
struct SingleFlight {
    keys: Arc<Mutex<HashSet<ThreadKey>>>,
}

impl SingleFlight {
    fn try_acquire(&self, key: &ThreadKey) -> Option<FlightGuard> {
        let mut keys = self.keys.lock().unwrap_or_else(|p| p.into_inner());
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(FlightGuard {
            keys: Arc::clone(&self.keys),
            key: key.clone(),
        })
    }

    fn contains(&self, key: &ThreadKey) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(key)
    }
}

/// Releases its pair from the in-flight set when dropped
#[derive(Debug)]
struct FlightGuard {
    keys: Arc<Mutex<HashSet<ThreadKey>>>,
    key: ThreadKey,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.key);
    }
}

/// Sends user messages into a [`ConversationThread`]
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use confidant::api::HttpCompanionApi;
/// use confidant::config::Config;
/// use confidant::dispatcher::{MessageDispatcher, SendOutcome};
/// use confidant::thread::ConversationThread;
///
/// # async fn example() -> confidant::error::Result<()> {
/// let config = Config::default();
/// let api = Arc::new(HttpCompanionApi::from_config(&config)?);
/// let thread = ConversationThread::new(api.clone());
/// let dispatcher = MessageDispatcher::new(api, thread.clone(), &config.chat);
///
/// thread.load("sophia", "guest_abc123").await?;
/// if let SendOutcome::Delivered { reply } = dispatcher.send("sophia", "guest_abc123", "Hello").await? {
///     println!("{}", reply.unwrap_or_default());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MessageDispatcher {
    api: Arc<dyn CompanionApi>,
    thread: ConversationThread,
    error_message: String,
    flights: SingleFlight,
}

impl MessageDispatcher {
    /// Creates a dispatcher writing into `thread`
    ///
    /// # Arguments
    ///
    /// * `api` - Backend client used for the send request
    /// * `thread` - Thread handle shared with the view
    /// * `chat` - Chat settings; supplies the text appended after a failed send
    pub fn new(api: Arc<dyn CompanionApi>, thread: ConversationThread, chat: &ChatConfig) -> Self {
        Self {
            api,
            thread,
            error_message: chat.error_message.clone(),
            flights: SingleFlight::default(),
        }
    }

    /// The thread this dispatcher writes into
    pub fn thread(&self) -> &ConversationThread {
        &self.thread
    }

    /// Returns true while a send for the pair is unresolved
    pub fn is_sending(&self, companion_id: &str, session_token: &str) -> bool {
        self.flights
            .contains(&ThreadKey::new(companion_id, session_token))
    }

    /// Sends `text` to a companion
    ///
    /// # Arguments
    ///
    /// * `companion_id` - Companion the message is addressed to
    /// * `session_token` - Visitor's anonymous session token
    /// * `text` - Message text; surrounding whitespace is trimmed
    ///
    /// # Returns
    ///
    /// The [`SendOutcome`]. A failed request is an outcome, not an error.
    ///
    /// # Errors
    ///
    /// Precondition violations are returned before any request is made and
    /// leave the thread unchanged:
    ///
    /// - [`ConfidantError::EmptyMessage`] if `text` is blank
    /// - [`ConfidantError::ThreadNotOpen`] if the pair is not the active thread
    /// - [`ConfidantError::SendInFlight`] if a send for the pair is unresolved
    pub async fn send(
        &self,
        companion_id: &str,
        session_token: &str,
        text: &str,
    ) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConfidantError::EmptyMessage.into());
        }

        let key = ThreadKey::new(companion_id, session_token);
        if !self.thread.is_active(&key) {
            return Err(ConfidantError::ThreadNotOpen(companion_id.to_string()).into());
        }

        let _guard = self.flights.try_acquire(&key).ok_or_else(|| {
            tracing::debug!("Rejecting send to {}: another send in flight", companion_id);
            ConfidantError::SendInFlight(companion_id.to_string())
        })?;

        let pending = Message::pending_user(text);
        self.thread
            .with_active(&key, |messages| push_message(messages, pending.clone()))
            .ok_or_else(|| ConfidantError::ThreadNotOpen(companion_id.to_string()))??;

        let request = ChatRequest {
            companion_id: companion_id.to_string(),
            message: text.to_string(),
            session_id: session_token.to_string(),
        };
        tracing::debug!("Dispatching message {} to {}", pending.id, companion_id);

        let outcome = match self.api.send_message(&request).await {
            Ok(response) => {
                if self.thread.reconcile_if_active(&key, response.thread) {
                    SendOutcome::Delivered {
                        reply: response.reply,
                    }
                } else {
                    SendOutcome::Discarded
                }
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!("Send to {} failed: {}", companion_id, reason);
                let notice = Message::system_error(self.error_message.clone());
                if self.thread.fail_if_active(&key, &pending, notice) {
                    SendOutcome::Failed { reason }
                } else {
                    SendOutcome::Discarded
                }
            }
        };

        if outcome == SendOutcome::Discarded {
            tracing::debug!("Discarding send result for {}: view moved on", companion_id);
        }
        increment_counter!("confidant_messages_sent_total", "outcome" => outcome.label());

        Ok(outcome)
    }
}
