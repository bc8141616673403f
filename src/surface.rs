//! Line-oriented terminal surface
//!
//! Reads commands from stdin and prints what the pet is doing to stdout.
//! Logs go to stderr so the two streams stay apart.

use crate::credentials::Credential;
use crate::runtime::{CredentialStore, PetHandle, SurfaceUpdate};
use crate::state_machine::{Animation, Event};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

pub const HELP: &str = "commands: ask <question> | poke | drag | drop | key <api key> | quit";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Poke,
    Drag,
    Drop,
    Key(String),
    Help,
    Quit,
}

/// Bare text is a question; blank lines are ignored
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

    Some(match verb.to_ascii_lowercase().as_str() {
        "ask" if !rest.is_empty() => Command::Ask(rest.to_string()),
        "poke" | "click" if rest.is_empty() => Command::Poke,
        "drag" if rest.is_empty() => Command::Drag,
        "drop" if rest.is_empty() => Command::Drop,
        "key" if !rest.is_empty() => Command::Key(rest.to_string()),
        "help" | "?" if rest.is_empty() => Command::Help,
        "quit" | "exit" if rest.is_empty() => Command::Quit,
        _ => Command::Ask(line.to_string()),
    })
}

/// Text printed for a surface update, if any
pub fn render(update: &SurfaceUpdate) -> Option<String> {
    match update {
        SurfaceUpdate::ShowAnimation {
            animation: Animation::Idle,
        } => None,
        SurfaceUpdate::ShowAnimation { animation } => {
            Some(format!("[doge] *{}*", animation.asset()))
        }
        SurfaceUpdate::ShowBubble { bubble } => {
            Some(format!("[doge] ({}) {}", bubble.mood, bubble.text))
        }
        SurfaceUpdate::HideBubble => None,
        SurfaceUpdate::PromptCredential => Some(
            "[doge] Much need API key. Type `key <your OpenAI key>` and ask again.".to_string(),
        ),
    }
}

pub struct TerminalSurface<S: CredentialStore> {
    handle: PetHandle,
    credentials: Arc<S>,
    shutdown: CancellationToken,
}

impl<S: CredentialStore + 'static> TerminalSurface<S> {
    pub fn new(handle: PetHandle, credentials: Arc<S>, shutdown: CancellationToken) -> Self {
        Self {
            handle,
            credentials,
            shutdown,
        }
    }

    /// Run until `quit`, end of input or shutdown
    pub async fn run(self) -> std::io::Result<()> {
        let printer = tokio::spawn(print_updates(self.handle.subscribe(), self.shutdown.clone()));
        println!("{HELP}");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                () = self.shutdown.cancelled() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else { break };
            let Some(command) = parse_command(&line) else {
                continue;
            };
            if !self.dispatch(command).await {
                break;
            }
        }

        self.shutdown.cancel();
        let _ = printer.await;
        Ok(())
    }

    /// Returns false when the user asked to quit
    async fn dispatch(&self, command: Command) -> bool {
        let event = match command {
            Command::Ask(query) => Event::click(query),
            Command::Poke => Event::Poke,
            Command::Drag => Event::DragStart,
            Command::Drop => Event::DragEnd,
            Command::Key(secret) => {
                self.save_key(&secret);
                return true;
            }
            Command::Help => {
                println!("{HELP}");
                return true;
            }
            Command::Quit => return false,
        };

        if self.handle.event_tx.send(event).await.is_err() {
            tracing::warn!("Pet runtime is gone");
            return false;
        }
        true
    }

    fn save_key(&self, secret: &str) {
        let Some(credential) = Credential::new(secret) else {
            println!("[doge] Such empty. Key not saved.");
            return;
        };
        match self.credentials.set(&credential) {
            Ok(()) => println!("[doge] Key saved. Wow."),
            Err(e) => {
                tracing::error!(error = %e, "Failed to save API key");
                println!("[doge] Could not save key: {e}");
            }
        }
    }
}

async fn print_updates(
    mut updates: broadcast::Receiver<SurfaceUpdate>,
    shutdown: CancellationToken,
) {
    loop {
        let update = tokio::select! {
            () = shutdown.cancelled() => break,
            update = updates.recv() => update,
        };
        match update {
            Ok(update) => {
                if let Some(text) = render(&update) {
                    println!("{text}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Surface fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
