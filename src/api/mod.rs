//! Remote companion backend abstraction
//!
//! This module defines the [`CompanionApi`] trait, the single seam between
//! the session core and the network. Implementations:
//!
//! - [`http::HttpCompanionApi`] -- reqwest client for the JSON/HTTP backend.
//! - [`fake::FakeCompanionApi`] -- in-process fake used in tests (cfg(test)
//!   only).
//!
//! The core holds implementations as `Arc<dyn CompanionApi>`, so the thread,
//! dispatcher and health monitor can share one client.

use crate::error::Result;
use crate::message::Message;

pub mod http;
pub mod types;

#[cfg(test)]
pub mod fake;

pub use http::HttpCompanionApi;
pub use types::{
    parse_timestamp, ChatRequest, Companion, CompanionInput, SendResponse, DEFAULT_AVATAR_PATH,
};

/// Operations the session core consumes from the companion backend.
///
/// Each method maps to one endpoint. Implementations translate transport
/// and HTTP failures into the matching [`crate::error::ConfidantError`]
/// variant so callers can react without inspecting status codes.
#[async_trait::async_trait]
pub trait CompanionApi: Send + Sync + std::fmt::Debug {
    /// Liveness probe against the backend root.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ConfidantError::HealthCheck`] for any
    /// non-success status or transport failure.
    async fn probe(&self) -> Result<()>;

    /// Lists the companion catalog.
    async fn list_companions(&self) -> Result<Vec<Companion>>;

    /// Fetches one companion.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ConfidantError::CompanionNotFound`] when the
    /// id does not resolve.
    async fn get_companion(&self, id: &str) -> Result<Companion>;

    /// Creates a companion.
    async fn create_companion(&self, input: &CompanionInput) -> Result<Companion>;

    /// Replaces a companion's descriptive fields.
    async fn update_companion(&self, id: &str, input: &CompanionInput) -> Result<Companion>;

    /// Deletes a companion.
    async fn delete_companion(&self, id: &str) -> Result<()>;

    /// Fetches the authoritative history for a (companion, session) pair,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ConfidantError::ThreadLoad`] on failure.
    async fn load_thread(&self, companion_id: &str, session_id: &str) -> Result<Vec<Message>>;

    /// Sends a user message and returns the full updated thread.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ConfidantError::Send`] on failure.
    async fn send_message(&self, request: &ChatRequest) -> Result<SendResponse>;
}
