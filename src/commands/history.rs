use colored::Colorize;

use crate::api::CompanionApi;
use crate::commands::{format_message, resolve_companion};
use crate::error::{ConfidantError, Result};
use crate::identity::SessionIdentity;
use crate::thread::{ConversationThread, LoadOutcome};
use std::sync::Arc;

/// Print the stored conversation with a companion for this identity
///
/// # Arguments
///
/// * `api` - Backend client
/// * `identity` - Source of the session token
/// * `companion` - Companion id or slug
/// * `json` - Print the normalized messages as JSON
///
/// # Errors
///
/// Returns [`ConfidantError::CompanionNotFound`] or
/// [`ConfidantError::ThreadLoad`] when the lookup or fetch fails
pub async fn show_history(
    api: Arc<dyn CompanionApi>,
    identity: &SessionIdentity,
    companion: &str,
    json: bool,
) -> Result<()> {
    let companion = resolve_companion(api.as_ref(), companion).await?;
    let token = identity.get_or_create();
    let thread = ConversationThread::new(api);

    let messages = match thread.load(companion.key(), &token).await? {
        LoadOutcome::Loaded(messages) => messages,
        LoadOutcome::Stale => Vec::new(),
    };

    if json {
        let out = serde_json::to_string_pretty(&messages).map_err(ConfidantError::Serialization)?;
        println!("{}", out);
        return Ok(());
    }

    if messages.is_empty() {
        println!(
            "{}",
            format!("No conversation with {} yet.", companion.name).yellow()
        );
        return Ok(());
    }

    println!("\nConversation with {}:\n", companion.name.bold());
    for message in &messages {
        println!("{}", format_message(message, &companion.name));
    }
    println!();
    Ok(())
}
