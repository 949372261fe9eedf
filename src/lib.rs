//! Confidant - conversational companion client library
//!
//! This library provides the client-side session core for chatting with
//! companion personas hosted by a Confidant backend: an anonymous session
//! identity, the local copy of each conversation, optimistic message sending
//! and backend liveness monitoring.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `identity`: Anonymous session token and its key-value stores
//! - `thread`: Client-side conversation state and stale-response guard
//! - `dispatcher`: Optimistic, single-flight message sending
//! - `health`: Periodic liveness probing
//! - `api`: Backend abstraction and its reqwest implementation
//! - `message`: Conversation message model
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use confidant::{Config, ConversationThread, MessageDispatcher, SessionIdentity};
//! use confidant::api::HttpCompanionApi;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let identity = SessionIdentity::from_config(&config.identity);
//!     let token = identity.get_or_create();
//!
//!     let api = Arc::new(HttpCompanionApi::from_config(&config)?);
//!     let thread = ConversationThread::new(api.clone());
//!     let dispatcher = MessageDispatcher::new(api, thread.clone(), &config.chat);
//!
//!     thread.load("sophia", &token).await?;
//!     dispatcher.send("sophia", &token, "Hello").await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod identity;
pub mod message;
pub mod thread;

// Re-export commonly used types
pub use api::{Companion, CompanionApi};
pub use config::Config;
pub use dispatcher::{MessageDispatcher, SendOutcome};
pub use error::{ConfidantError, Result};
pub use health::{HealthHandle, HealthMonitor, HealthStatus};
pub use identity::SessionIdentity;
pub use message::{DeliveryState, Message, Role};
pub use thread::{ConversationThread, LoadOutcome, ThreadStatus};
