//! Wire types for the companion backend
//!
//! These structures mirror the JSON bodies exchanged with the backend. The
//! server stores messages with a `role` of `user` or `assistant` and a naive
//! `created_at` timestamp; [`WireMessage`] absorbs both quirks before the
//! data reaches the rest of the crate as [`Message`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::message::{DeliveryState, Message, Role};

/// Default avatar used when a companion is created without one
pub const DEFAULT_AVATAR_PATH: &str = "/public/assets/logo.png";

/// A companion persona, as served by the catalog endpoints
///
/// The list endpoint returns a trimmed projection, so every descriptive
/// field defaults to empty when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Companion {
    /// Server-assigned identifier, when the backend exposes one
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// URL-friendly unique name
    #[serde(default)]
    pub slug: String,

    /// Display name
    pub name: String,

    /// One-line biography
    #[serde(default)]
    pub short_bio: String,

    /// Longer background story
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_backstory: Option<String>,

    /// Personality trait labels
    #[serde(default)]
    pub traits: Vec<String>,

    /// Avatar image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_path: Option<String>,

    /// Creation time as reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Last update time as reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Companion {
    /// Creates a companion with only the required descriptive fields set
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        short_bio: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            slug: slug.into(),
            name: name.into(),
            short_bio: short_bio.into(),
            long_backstory: None,
            traits: Vec::new(),
            avatar_path: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Identifier to use in chat requests: the server id, else the slug
    ///
    /// # Examples
    ///
    /// ```
    /// use confidant::api::Companion;
    ///
    /// let mut companion = Companion::new("nova", "Nova", "Curious explorer.");
    /// assert_eq!(companion.key(), "nova");
    /// companion.id = Some("665f1c".to_string());
    /// assert_eq!(companion.key(), "665f1c");
    /// ```
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.slug)
    }
}

/// Body for creating or replacing a companion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionInput {
    /// Display name
    pub name: String,
    /// URL-friendly unique name
    pub slug: String,
    /// One-line biography
    pub short_bio: String,
    /// Longer background story
    #[serde(default)]
    pub long_backstory: String,
    /// Personality trait labels
    #[serde(default)]
    pub traits: Vec<String>,
    /// Avatar image reference
    #[serde(default = "default_avatar_path")]
    pub avatar_path: String,
}

fn default_avatar_path() -> String {
    DEFAULT_AVATAR_PATH.to_string()
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Companion the message is addressed to
    pub companion_id: String,
    /// Message text
    pub message: String,
    /// Anonymous session token scoping the history
    pub session_id: String,
}

/// Message as stored by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    /// Server identifier
    #[serde(alias = "_id")]
    pub id: String,
    /// `user` or `assistant`
    pub role: Role,
    /// Message text
    pub content: String,
    /// Creation time; naive values are read as UTC
    #[serde(alias = "created_at", deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl From<WireMessage> for Message {
    /// Anything the server returns is authoritative, so user messages are
    /// marked confirmed.
    fn from(wire: WireMessage) -> Self {
        let delivery_state = match wire.role {
            Role::User => Some(DeliveryState::Confirmed),
            Role::Companion | Role::SystemError => None,
        };
        Message {
            id: wire.id,
            role: wire.role,
            content: wire.content,
            timestamp: wire.timestamp,
            delivery_state,
        }
    }
}

/// Raw body of a successful `POST /api/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct WireSendResponse {
    /// Companion reply text
    #[serde(default)]
    pub reply: Option<String>,
    /// Full updated thread
    pub thread: Vec<WireMessage>,
}

/// Result of a successful send: the authoritative thread after the exchange
#[derive(Debug, Clone, PartialEq)]
pub struct SendResponse {
    /// Companion reply text, when the server echoes it separately
    pub reply: Option<String>,
    /// Full updated thread, oldest first
    pub thread: Vec<Message>,
}

impl From<WireSendResponse> for SendResponse {
    fn from(wire: WireSendResponse) -> Self {
        Self {
            reply: wire.reply,
            thread: wire.thread.into_iter().map(Message::from).collect(),
        }
    }
}

/// Parses an RFC 3339 timestamp, falling back to a naive ISO 8601 value
/// interpreted as UTC
///
/// # Examples
///
/// ```
/// use confidant::api::parse_timestamp;
///
/// let a = parse_timestamp("2025-03-01T10:00:00Z").unwrap();
/// let b = parse_timestamp("2025-03-01T10:00:00.000000").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp {:?}: {}", raw, e))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}
