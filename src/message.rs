//! Chat message model
//!
//! A [`Message`] is one entry of a conversation thread. Messages that the
//! local user originated carry a [`DeliveryState`] which follows a small
//! state machine:
//!
//! ```text
//! pending --success--> confirmed
//! pending --failure--> failed      (terminal)
//! ```
//!
//! Companion replies and locally generated `system-error` notices carry no
//! delivery state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::Companion;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The local visitor
    #[serde(rename = "user")]
    User,
    /// The AI companion (the server calls this role `assistant`)
    #[serde(rename = "companion", alias = "assistant")]
    Companion,
    /// A client-side notice explaining a failed exchange
    #[serde(rename = "system-error", alias = "error")]
    SystemError,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Companion => write!(f, "companion"),
            Role::SystemError => write!(f, "system-error"),
        }
    }
}

/// Delivery state of a locally originated message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    /// Shown optimistically, waiting for the server
    Pending,
    /// Acknowledged by the server
    Confirmed,
    /// The send failed; kept in the thread for inspection
    Failed,
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryState::Pending => write!(f, "pending"),
            DeliveryState::Confirmed => write!(f, "confirmed"),
            DeliveryState::Failed => write!(f, "failed"),
        }
    }
}

/// A single entry in a conversation thread
///
/// # Examples
///
/// ```
/// use confidant::message::{DeliveryState, Message, Role};
///
/// let msg = Message::pending_user("Hello");
/// assert_eq!(msg.role, Role::User);
/// assert_eq!(msg.delivery_state, Some(DeliveryState::Pending));
/// assert!(msg.id.starts_with("local-"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier, unique within the thread
    pub id: String,
    /// Author of the message
    pub role: Role,
    /// Message text
    pub content: String,
    /// Server- or client-assigned timestamp
    pub timestamp: DateTime<Utc>,
    /// Delivery state; only set on user messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_state: Option<DeliveryState>,
}

impl Message {
    /// Creates an optimistic user message with a locally generated id
    pub fn pending_user(content: impl Into<String>) -> Self {
        Self {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            delivery_state: Some(DeliveryState::Pending),
        }
    }

    /// Creates a client-side error notice
    pub fn system_error(content: impl Into<String>) -> Self {
        Self {
            id: format!("error-{}", uuid::Uuid::new_v4()),
            role: Role::SystemError,
            content: content.into(),
            timestamp: Utc::now(),
            delivery_state: None,
        }
    }

    /// Builds the greeting shown when a thread with `companion` is empty
    ///
    /// The greeting is presentation only and is never added to a thread.
    ///
    /// # Examples
    ///
    /// ```
    /// use confidant::api::Companion;
    /// use confidant::message::{Message, Role};
    ///
    /// let companion = Companion::new("sophia", "Sophia", "A gentle poet.");
    /// let greeting = Message::greeting(&companion);
    /// assert_eq!(greeting.role, Role::Companion);
    /// assert!(greeting.content.starts_with("Hello! I'm Sophia."));
    /// ```
    pub fn greeting(companion: &Companion) -> Self {
        Self {
            id: "welcome".to_string(),
            role: Role::Companion,
            content: format!(
                "Hello! I'm {}. {} What would you like to talk about?",
                companion.name, companion.short_bio
            ),
            timestamp: Utc::now(),
            delivery_state: None,
        }
    }

    /// Returns true when the message is waiting on the server
    pub fn is_pending(&self) -> bool {
        self.delivery_state == Some(DeliveryState::Pending)
    }

    /// Returns true when the message failed to send
    pub fn is_failed(&self) -> bool {
        self.delivery_state == Some(DeliveryState::Failed)
    }
}
