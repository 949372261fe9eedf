//! Command-line interface definition for Confidant
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for browsing companions, chatting, and inspecting the
//! local identity and backend health.

use clap::{Parser, Subcommand};

/// Confidant - terminal client for conversational companions
///
/// Chat with companion personas hosted by a Confidant backend under an
/// anonymous session identity.
#[derive(Parser, Debug, Clone)]
#[command(name = "confidant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the backend base URL from config
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Confidant
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Browse and manage the companion catalog
    Companions {
        /// Catalog subcommand
        #[command(subcommand)]
        command: CompanionCommand,
    },

    /// Start an interactive conversation with a companion
    Chat {
        /// Companion id or slug
        companion: String,
    },

    /// Print the stored conversation with a companion
    History {
        /// Companion id or slug
        companion: String,

        /// Print raw JSON instead of a transcript
        #[arg(long)]
        json: bool,
    },

    /// Check whether the backend is reachable
    Health {
        /// Keep polling and print every status change
        #[arg(short, long)]
        watch: bool,
    },

    /// Inspect or reset the anonymous session identity
    Identity {
        /// Identity subcommand
        #[command(subcommand)]
        command: IdentityCommand,
    },
}

/// Companion catalog subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CompanionCommand {
    /// List available companions
    List {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show detailed information about a companion
    Show {
        /// Companion id or slug
        id: String,
    },

    /// Create a companion (requires an admin token)
    Create {
        /// Display name
        #[arg(long)]
        name: String,

        /// URL-friendly identifier
        #[arg(long)]
        slug: String,

        /// One-line introduction
        #[arg(long)]
        short_bio: String,

        /// Longer background story
        #[arg(long)]
        long_backstory: Option<String>,

        /// Personality trait; repeat for several
        #[arg(long = "trait")]
        traits: Vec<String>,

        /// Avatar image path
        #[arg(long)]
        avatar: Option<String>,
    },

    /// Delete a companion (requires an admin token)
    Delete {
        /// Companion id
        id: String,
    },
}

/// Identity subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum IdentityCommand {
    /// Print the session token, creating one if needed
    Show,

    /// Forget the session token; the next run starts a fresh identity
    Reset,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            api_url: None,
            verbose: false,
            command: Commands::Health { watch: false },
        }
    }
}
