//! Administrative console on stdin.
//!
//! Commands: `reload`, `test <kind>`, `players`, `hit <player>`, `help`.

use std::io::BufRead;
use std::sync::Arc;
use std::thread::JoinHandle;

use dispatcher::ConfigStore;
use relay_events::{samples, EventKind};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::runtime::{DamageSource, WorkItem, WorkSender};

pub const HELP: &str = "Commands:
  reload           reload the configuration file
  test <kind>      trigger a sample event (subscribe|sub, gift, cheer|bits, raid, follow)
  players          list online players
  hit <player>     have the newest relay hostile hit a player
  help             show this help";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Reload,
    /// `Err` holds the unrecognised argument, or `None` if it was missing
    Test(Result<EventKind, Option<String>>),
    Players,
    Hit(Option<String>),
    Help,
    Unknown(String),
}

impl ConsoleCommand {
    /// Parses a line; blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = words.next()?.to_ascii_lowercase();
        let arg = words.next().map(str::to_string);
        Some(match command.as_str() {
            "reload" => ConsoleCommand::Reload,
            "test" => ConsoleCommand::Test(match arg {
                Some(arg) => samples::kind_for_alias(&arg).ok_or(Some(arg)),
                None => Err(None),
            }),
            "players" | "list" => ConsoleCommand::Players,
            "hit" => ConsoleCommand::Hit(arg),
            "help" | "?" => ConsoleCommand::Help,
            _ => ConsoleCommand::Unknown(command),
        })
    }
}

/// Runs a command and returns the text to show the operator.
pub async fn execute(command: ConsoleCommand, queue: &WorkSender, store: &ConfigStore) -> String {
    match command {
        ConsoleCommand::Reload => match store.reload() {
            Ok(_) => "Configuration reloaded!".to_string(),
            Err(e) => {
                tracing::error!(error = %e, "configuration reload failed; keeping previous");
                format!("Reload failed: {}", e)
            }
        },
        ConsoleCommand::Test(Ok(kind)) => {
            let envelope = samples::sample_envelope(kind);
            match queue.send(WorkItem::Event(envelope)).await {
                Ok(()) => format!("Triggered test {} event!", kind),
                Err(_) => "Game loop is not running".to_string(),
            }
        }
        ConsoleCommand::Test(Err(None)) => {
            format!("Usage: test <event_type>\nAvailable events: {}", samples::AVAILABLE)
        }
        ConsoleCommand::Test(Err(Some(arg))) => format!(
            "Unknown event type: {}\nAvailable events: {}",
            arg,
            samples::AVAILABLE
        ),
        ConsoleCommand::Players => {
            let (reply, response) = oneshot::channel();
            if queue.send(WorkItem::ListActors(reply)).await.is_err() {
                return "Game loop is not running".to_string();
            }
            match response.await {
                Ok(names) if names.is_empty() => "No players online".to_string(),
                Ok(names) => format!("Online ({}): {}", names.len(), names.join(", ")),
                Err(_) => "Game loop is not running".to_string(),
            }
        }
        ConsoleCommand::Hit(Some(victim)) => {
            let item = WorkItem::ActorDamaged {
                victim: victim.clone(),
                source: DamageSource::LatestHostile,
            };
            match queue.send(item).await {
                Ok(()) => format!("{} was hit", victim),
                Err(_) => "Game loop is not running".to_string(),
            }
        }
        ConsoleCommand::Hit(None) => "Usage: hit <player>".to_string(),
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Unknown(command) => {
            format!("Unknown command: {} (try `help`)", command)
        }
    }
}

/// Reads commands from `input` until it closes, blocking the calling thread.
pub fn run_blocking<R: BufRead>(
    input: R,
    runtime: Handle,
    queue: WorkSender,
    store: Arc<ConfigStore>,
) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "console input failed");
                break;
            }
        };
        if let Some(command) = ConsoleCommand::parse(&line) {
            println!("{}", runtime.block_on(execute(command, &queue, &store)));
        }
    }
    tracing::debug!("console closed");
}

/// Starts the console on its own thread reading stdin.
///
/// Must be called from inside a Tokio runtime.
pub fn spawn_stdin(queue: WorkSender, store: Arc<ConfigStore>) -> std::io::Result<JoinHandle<()>> {
    let runtime = Handle::current();
    std::thread::Builder::new()
        .name("console".to_string())
        .spawn(move || run_blocking(std::io::stdin().lock(), runtime, queue, store))
}
