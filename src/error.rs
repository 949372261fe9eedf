//! Error types for Confidant
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Confidant operations
///
/// Covers identity storage, thread loading, message dispatch, liveness
/// probing, configuration, and the remote API boundary. Operation-level
/// failures that the core converts into explicit state (a failed send, an
/// offline probe) are still represented here so that callers can inspect
/// the cause.
#[derive(Error, Debug)]
pub enum ConfidantError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The identity key-value store could not be read or written
    #[error("Identity storage unavailable: {0}")]
    IdentityStorageUnavailable(String),

    /// Fetching the conversation history failed
    #[error("Failed to load thread for companion {companion_id}: {message}")]
    ThreadLoad {
        /// Companion whose thread was requested
        companion_id: String,
        /// Underlying failure
        message: String,
    },

    /// The companion id did not resolve on the server
    #[error("Companion not found: {0}")]
    CompanionNotFound(String),

    /// The send-message request failed at the transport or HTTP level
    #[error("Send failed: {0}")]
    Send(String),

    /// The liveness probe failed
    #[error("Health check failed: {0}")]
    HealthCheck(String),

    /// Message text was empty after trimming
    #[error("Message text cannot be empty")]
    EmptyMessage,

    /// Another send is still in flight for the same thread
    #[error("A message is already being sent to companion {0}")]
    SendInFlight(String),

    /// The thread addressed by an operation is not the one currently open
    #[error("No open thread for companion {0}")]
    ThreadNotOpen(String),

    /// A message with this id already exists in the thread
    #[error("Duplicate message id: {0}")]
    DuplicateMessage(String),

    /// A message with this id does not exist in the thread
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// The thread already holds a pending message
    #[error("Thread already has a pending message: {0}")]
    PendingMessageExists(String),

    /// Remote API returned an unexpected status or payload
    #[error("API error: {0}")]
    Api(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for Confidant operations
///
/// Uses `anyhow::Error` as the error type so that context can be attached
/// while the concrete [`ConfidantError`] stays recoverable via `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
