/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `companions` - Catalog listing and admin writes
- `chat`       - Interactive conversation with a companion
- `history`    - Print a stored conversation
- `health`     - Backend liveness check
- `identity`   - Inspect or reset the anonymous session token

Handlers are small and work through the library components: the
`CompanionApi` client, `SessionIdentity`, `ConversationThread`,
`MessageDispatcher` and `HealthMonitor`.
*/

use std::sync::Arc;

use colored::Colorize;

use crate::api::{Companion, CompanionApi, HttpCompanionApi};
use crate::config::Config;
use crate::error::{ConfidantError, Result};
use crate::message::{DeliveryState, Message, Role};

pub mod chat;
pub mod companions;
pub mod health;
pub mod history;
pub mod identity;
pub mod special_commands;

/// Build the HTTP backend client from configuration
///
/// # Errors
///
/// Returns an error if the base URL is invalid or the client cannot be built
pub fn build_api(config: &Config) -> Result<Arc<dyn CompanionApi>> {
    Ok(Arc::new(HttpCompanionApi::from_config(config)?))
}

/// Look up a companion by server id or slug
///
/// The id lookup is tried first. When it reports the companion missing, the
/// catalog is searched for a matching slug.
///
/// # Errors
///
/// Returns [`ConfidantError::CompanionNotFound`] if neither lookup matches
pub async fn resolve_companion(api: &dyn CompanionApi, id_or_slug: &str) -> Result<Companion> {
    match api.get_companion(id_or_slug).await {
        Ok(companion) => return Ok(companion),
        Err(e) => match e.downcast_ref::<ConfidantError>() {
            Some(ConfidantError::CompanionNotFound(_)) => {
                tracing::debug!("No companion with id {}, trying slug", id_or_slug);
            }
            _ => return Err(e),
        },
    }

    api.list_companions()
        .await?
        .into_iter()
        .find(|c| c.slug == id_or_slug || c.key() == id_or_slug)
        .ok_or_else(|| ConfidantError::CompanionNotFound(id_or_slug.to_string()).into())
}

/// Render one message as a transcript line
///
/// `companion_name` labels companion messages.
pub fn format_message(message: &Message, companion_name: &str) -> String {
    let time = message.timestamp.format("%H:%M");
    match message.role {
        Role::User => {
            let marker = match message.delivery_state {
                Some(DeliveryState::Pending) => format!(" {}", "(sending...)".dimmed()),
                Some(DeliveryState::Failed) => format!(" {}", "(not delivered)".red()),
                _ => String::new(),
            };
            format!(
                "{} {} {}{}",
                time.to_string().dimmed(),
                "You:".green().bold(),
                message.content,
                marker
            )
        }
        Role::Companion => format!(
            "{} {} {}",
            time.to_string().dimmed(),
            format!("{}:", companion_name).cyan().bold(),
            message.content
        ),
        Role::SystemError => format!("{} {}", "!".red().bold(), message.content.red()),
    }
}
