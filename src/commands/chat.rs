//! Interactive chat handler
//!
//! Opens the conversation for the current identity, prints its history (or a
//! greeting when empty), then reads lines with rustyline and sends them
//! through a [`MessageDispatcher`]. A [`HealthMonitor`] runs for as long as
//! the view is open.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::api::{Companion, CompanionApi};
use crate::commands::health::status_label;
use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
use crate::commands::{format_message, resolve_companion};
use crate::config::Config;
use crate::dispatcher::{MessageDispatcher, SendOutcome};
use crate::error::Result;
use crate::health::{HealthHandle, HealthMonitor, HealthStatus};
use crate::identity::SessionIdentity;
use crate::message::{Message, Role};
use crate::thread::{ConversationThread, LoadOutcome, ThreadStatus};

/// One open chat view: a companion, a session token and the components
/// that serve them
#[derive(Debug)]
pub struct ChatSession {
    companion: Companion,
    token: String,
    thread: ConversationThread,
    dispatcher: MessageDispatcher,
    show_greeting: bool,
}

impl ChatSession {
    /// Creates a session; nothing is fetched until [`Self::load`]
    pub fn new(
        api: Arc<dyn CompanionApi>,
        config: &Config,
        companion: Companion,
        token: String,
    ) -> Self {
        let thread = ConversationThread::new(Arc::clone(&api));
        let dispatcher = MessageDispatcher::new(api, thread.clone(), &config.chat);
        Self {
            companion,
            token,
            thread,
            dispatcher,
            show_greeting: config.chat.show_greeting,
        }
    }

    /// The thread backing this view
    pub fn thread(&self) -> &ConversationThread {
        &self.thread
    }

    /// Loads the conversation and returns the lines to display
    ///
    /// A load failure is reported as a line rather than an error so the
    /// view stays usable.
    pub async fn load(&self) -> Vec<String> {
        match self.thread.load(self.companion.key(), &self.token).await {
            Ok(LoadOutcome::Loaded(messages)) if messages.is_empty() => {
                if self.show_greeting {
                    vec![format_message(
                        &Message::greeting(&self.companion),
                        &self.companion.name,
                    )]
                } else {
                    Vec::new()
                }
            }
            Ok(LoadOutcome::Loaded(messages)) => messages
                .iter()
                .map(|m| format_message(m, &self.companion.name))
                .collect(),
            Ok(LoadOutcome::Stale) => Vec::new(),
            Err(e) => {
                tracing::warn!("Could not load conversation: {}", e);
                vec![format!(
                    "{} {}",
                    "!".red().bold(),
                    "Could not load the conversation. Type /reload to try again.".red()
                )]
            }
        }
    }

    /// Sends a line and returns what the view should print afterwards
    ///
    /// The user's own text is not repeated on delivery. On failure the
    /// undelivered message and the error notice are returned.
    ///
    /// # Errors
    ///
    /// Returns precondition errors from [`MessageDispatcher::send`]
    pub async fn submit(&self, text: &str) -> Result<Vec<String>> {
        let before: HashSet<String> = self.thread.messages().into_iter().map(|m| m.id).collect();

        let outcome = self
            .dispatcher
            .send(self.companion.key(), &self.token, text)
            .await?;

        let after = self.thread.messages();
        let lines = match outcome {
            SendOutcome::Delivered { .. } => after
                .iter()
                .filter(|m| !before.contains(&m.id) && m.role != Role::User)
                .map(|m| format_message(m, &self.companion.name))
                .collect(),
            SendOutcome::Failed { reason } => {
                tracing::debug!("Send failed: {}", reason);
                after
                    .iter()
                    .filter(|m| !before.contains(&m.id))
                    .map(|m| format_message(m, &self.companion.name))
                    .collect()
            }
            SendOutcome::Discarded => Vec::new(),
        };
        Ok(lines)
    }

    /// Closes the thread; late responses are ignored afterwards
    pub fn close(&self) {
        self.thread.close();
    }

    fn print_status(&self, health: HealthStatus) {
        let thread_state = match self.thread.status() {
            ThreadStatus::Idle => "closed".to_string(),
            ThreadStatus::Loading => "loading".to_string(),
            ThreadStatus::Ready => "ready".to_string(),
            ThreadStatus::LoadFailed(reason) => format!("load failed ({})", reason),
        };
        println!();
        println!("Companion:  {} ({})", self.companion.name, self.companion.key());
        println!("Backend:    {}", status_label(health));
        println!("Session:    {}", self.token);
        println!("Thread:     {} message(s), {}", self.thread.len(), thread_state);
        println!();
    }
}

/// Start an interactive conversation
///
/// # Arguments
///
/// * `config` - Global configuration
/// * `api` - Backend client
/// * `identity` - Source of the session token
/// * `companion` - Companion id or slug
///
/// # Errors
///
/// Returns an error if the companion cannot be resolved or the terminal
/// cannot be initialized
pub async fn run_chat(
    config: &Config,
    api: Arc<dyn CompanionApi>,
    identity: &SessionIdentity,
    companion: &str,
) -> Result<()> {
    let companion = resolve_companion(api.as_ref(), companion).await?;
    let token = identity.get_or_create();
    tracing::info!("Opening conversation with {}", companion.name);

    let health: HealthHandle = HealthMonitor::new(Arc::clone(&api))
        .start(Duration::from_secs(config.health.interval_seconds));
    let session = ChatSession::new(api, config, companion.clone(), token);

    let mut rl = DefaultEditor::new()?;

    println!(
        "\n{} {}\n{}\n",
        "Chatting with".bold(),
        companion.name.cyan().bold(),
        "Type /help for commands, /exit to leave.".dimmed()
    );
    for line in session.load().await {
        println!("{}", line);
    }

    let prompt = format!("{} ", "you>".green().bold());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_special_command(trimmed) {
                    Ok(SpecialCommand::ShowStatus) => {
                        session.print_status(health.status());
                        continue;
                    }
                    Ok(SpecialCommand::Reload) => {
                        for line in session.load().await {
                            println!("{}", line);
                        }
                        continue;
                    }
                    Ok(SpecialCommand::Help) => {
                        print_help();
                        continue;
                    }
                    Ok(SpecialCommand::Exit) => break,
                    Ok(SpecialCommand::None) => {}
                    Err(e) => {
                        println!("{}", e.to_string().yellow());
                        continue;
                    }
                }

                rl.add_history_entry(trimmed)?;

                if health.status() == HealthStatus::Offline {
                    println!("{}", "The backend looks offline; trying anyway...".yellow());
                }

                match session.submit(trimmed).await {
                    Ok(lines) => {
                        for line in lines {
                            println!("{}", line);
                        }
                    }
                    Err(e) => println!("{}", e.to_string().yellow()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                tracing::error!("Readline error: {:?}", err);
                break;
            }
        }
    }

    session.close();
    HealthMonitor::stop(health).await;
    println!("Goodbye!");
    Ok(())
}
