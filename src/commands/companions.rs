//! Companion catalog commands for Confidant
//!
//! Listing and inspecting companions is open to everyone; creating and
//! deleting require `api.admin_token` (or `CONFIDANT_ADMIN_TOKEN`), which the
//! HTTP client sends as a bearer token.

use colored::Colorize;
use prettytable::{format, row, Table};

use crate::api::{Companion, CompanionApi, CompanionInput, DEFAULT_AVATAR_PATH};
use crate::cli::CompanionCommand;
use crate::commands::resolve_companion;
use crate::error::{ConfidantError, Result};

/// Handle `confidant companions ...`
///
/// # Arguments
///
/// * `api` - Backend client
/// * `command` - Parsed catalog subcommand
///
/// # Errors
///
/// Propagates API errors; a missing companion surfaces as
/// [`ConfidantError::CompanionNotFound`]
pub async fn handle_companions(api: &dyn CompanionApi, command: CompanionCommand) -> Result<()> {
    match command {
        CompanionCommand::List { json } => list_companions(api, json).await,
        CompanionCommand::Show { id } => show_companion(api, &id).await,
        CompanionCommand::Create {
            name,
            slug,
            short_bio,
            long_backstory,
            traits,
            avatar,
        } => {
            let input = CompanionInput {
                name,
                slug,
                short_bio,
                long_backstory: long_backstory.unwrap_or_default(),
                traits,
                avatar_path: avatar.unwrap_or_else(|| DEFAULT_AVATAR_PATH.to_string()),
            };
            create_companion(api, &input).await
        }
        CompanionCommand::Delete { id } => delete_companion(api, &id).await,
    }
}

/// Print the catalog as a table or JSON
pub async fn list_companions(api: &dyn CompanionApi, json: bool) -> Result<()> {
    tracing::info!("Listing companions");
    let companions = api.list_companions().await?;

    if json {
        let out = serde_json::to_string_pretty(&companions).map_err(ConfidantError::Serialization)?;
        println!("{}", out);
        return Ok(());
    }

    if companions.is_empty() {
        println!("{}", "No companions available.".yellow());
        return Ok(());
    }

    println!("\nAvailable companions:\n");
    companions_table(&companions).printstd();
    println!();
    println!("Use {} to start a conversation.", "confidant chat <ID>".cyan());
    println!();
    Ok(())
}

fn companions_table(companions: &[Companion]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["ID".bold(), "Name".bold(), "About".bold(), "Traits".bold()]);

    for companion in companions {
        let traits = if companion.traits.is_empty() {
            "-".to_string()
        } else {
            companion.traits.join(", ")
        };
        table.add_row(row![
            companion.key().cyan(),
            companion.name,
            truncate(&companion.short_bio, 48),
            traits
        ]);
    }
    table
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}

/// Print one companion in detail
pub async fn show_companion(api: &dyn CompanionApi, id: &str) -> Result<()> {
    let companion = resolve_companion(api, id).await?;

    println!("\n{}\n", companion.name.bold());
    println!("ID:          {}", companion.key());
    println!("Slug:        {}", companion.slug);
    println!("About:       {}", companion.short_bio);
    if !companion.traits.is_empty() {
        println!("Traits:      {}", companion.traits.join(", "));
    }
    if let Some(avatar) = &companion.avatar_path {
        println!("Avatar:      {}", avatar);
    }
    if let Some(created) = &companion.created_at {
        println!("Created:     {}", created);
    }
    if let Some(story) = companion.long_backstory.as_deref().filter(|s| !s.is_empty()) {
        println!("\n{}", story);
    }
    println!();
    Ok(())
}

/// Create a companion and print its id
pub async fn create_companion(api: &dyn CompanionApi, input: &CompanionInput) -> Result<()> {
    tracing::info!("Creating companion {}", input.slug);
    let created = api.create_companion(input).await?;
    println!(
        "{}",
        format!("Created companion {} ({})", created.name, created.key()).green()
    );
    Ok(())
}

/// Delete a companion
pub async fn delete_companion(api: &dyn CompanionApi, id: &str) -> Result<()> {
    tracing::info!("Deleting companion {}", id);
    api.delete_companion(id).await?;
    println!("{}", format!("Deleted companion {}", id).green());
    Ok(())
}
