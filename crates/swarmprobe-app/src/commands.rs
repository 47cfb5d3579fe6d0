//! Text command surface: parsing and execution with streamed replies.

use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use swarmprobe_config::ProbeSettings;
use swarmprobe_core::{AddTask, EngineClient, InfoHash, SessionControl, extract_identifier};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::orchestrator::{ProbeMessage, ProbeOptions, ProbeOrchestrator};
use crate::report::render_existing_task_report;

/// Replies produced by one command, in emission order.
pub type ReplyStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Help text listing every command.
pub const HELP: &str = "\
commands:
  probe <magnet-link>   register, measure and remove a task (alias: magtest)
  add <magnet-link>     register a task and leave it running (alias: magadd)
  info <info-hash>      show the status of a registered task (alias: maginfo)
  relogin               reconnect to the engine
  help                  show this text
  quit                  leave the shell";

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Full health probe.
    Probe {
        /// Magnet link to probe.
        link: String,
    },
    /// Register without probing.
    Add {
        /// Magnet link to register.
        link: String,
    },
    /// Status of an existing task.
    Info {
        /// Info hash or magnet link.
        identifier: String,
    },
    /// Re-establish the engine session.
    Relogin,
    /// Show usage.
    Help,
    /// Leave the shell.
    Quit,
}

impl Command {
    /// Canonical command name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Probe { .. } => "probe",
            Self::Add { .. } => "add",
            Self::Info { .. } => "info",
            Self::Relogin => "relogin",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

/// Reasons a command line could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    /// The line was blank.
    #[error("empty command")]
    Empty,
    /// The command name is not recognised.
    #[error("unknown command")]
    Unknown {
        /// Name as typed.
        name: String,
    },
    /// A required argument was absent.
    #[error("missing argument")]
    MissingArgument {
        /// Command that needs the argument.
        command: &'static str,
        /// Argument placeholder.
        argument: &'static str,
    },
    /// More arguments than the command accepts.
    #[error("unexpected argument")]
    UnexpectedArgument {
        /// Command that received the argument.
        command: &'static str,
    },
}

impl CommandParseError {
    /// Reply text for the caller.
    #[must_use]
    pub fn reply(&self) -> String {
        match self {
            Self::Empty => "empty command; type 'help' for usage".to_string(),
            Self::Unknown { name } => format!("unknown command '{name}'; type 'help' for usage"),
            Self::MissingArgument { command, argument } => {
                format!("usage: {command} <{argument}>")
            }
            Self::UnexpectedArgument { command } => {
                format!("'{command}' takes a single argument")
            }
        }
    }
}

fn single_argument<'a>(
    command: &'static str,
    argument: &'static str,
    mut rest: impl Iterator<Item = &'a str>,
) -> Result<String, CommandParseError> {
    let value = rest
        .next()
        .ok_or(CommandParseError::MissingArgument { command, argument })?;
    if rest.next().is_some() {
        return Err(CommandParseError::UnexpectedArgument { command });
    }
    Ok(value.to_string())
}

fn no_argument<'a>(
    command: Command,
    mut rest: impl Iterator<Item = &'a str>,
) -> Result<Command, CommandParseError> {
    if rest.next().is_some() {
        return Err(CommandParseError::UnexpectedArgument {
            command: command.name(),
        });
    }
    Ok(command)
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or(CommandParseError::Empty)?;
        match name.trim_start_matches('/').to_ascii_lowercase().as_str() {
            "probe" | "magtest" => Ok(Self::Probe {
                link: single_argument("probe", "magnet-link", tokens)?,
            }),
            "add" | "magadd" => Ok(Self::Add {
                link: single_argument("add", "magnet-link", tokens)?,
            }),
            "info" | "maginfo" => Ok(Self::Info {
                identifier: single_argument("info", "info-hash", tokens)?,
            }),
            "relogin" => no_argument(Self::Relogin, tokens),
            "help" => no_argument(Self::Help, tokens),
            "quit" | "exit" => no_argument(Self::Quit, tokens),
            _ => Err(CommandParseError::Unknown {
                name: name.to_string(),
            }),
        }
    }
}

/// Executes commands against the engine and renders their replies.
pub struct CommandAdapter {
    orchestrator: Arc<ProbeOrchestrator>,
    engine: Arc<dyn EngineClient>,
    session: Arc<dyn SessionControl>,
    add_save_path: Option<String>,
}

impl CommandAdapter {
    /// Adapter using configured probe settings.
    #[must_use]
    pub fn new(
        engine: Arc<dyn EngineClient>,
        session: Arc<dyn SessionControl>,
        settings: &ProbeSettings,
    ) -> Self {
        Self::with_options(
            engine,
            session,
            ProbeOptions::from_settings(settings),
            settings.add_save_path.clone(),
        )
    }

    /// Adapter with explicit probe options.
    #[must_use]
    pub fn with_options(
        engine: Arc<dyn EngineClient>,
        session: Arc<dyn SessionControl>,
        options: ProbeOptions,
        add_save_path: Option<String>,
    ) -> Self {
        let orchestrator = Arc::new(ProbeOrchestrator::new(Arc::clone(&engine), options));
        Self {
            orchestrator,
            engine,
            session,
            add_save_path,
        }
    }

    /// Run `command`; the returned stream yields each reply as it is produced.
    pub async fn execute(&self, command: Command) -> ReplyStream {
        let reply = match command {
            Command::Probe { link } => return self.probe(link),
            Command::Add { link } => self.add(&link).await,
            Command::Info { identifier } => self.info(&identifier).await,
            Command::Relogin => self.relogin().await,
            Command::Help => HELP.to_string(),
            Command::Quit => "bye".to_string(),
        };
        Box::pin(tokio_stream::once(reply))
    }

    /// Start a probe in its own task and stream its messages.
    ///
    /// The probe keeps running to cleanup if the stream is dropped early.
    #[must_use]
    pub fn probe(&self, link: String) -> ReplyStream {
        let (sender, receiver) = mpsc::unbounded_channel::<ProbeMessage>();
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            orchestrator.probe(&link, &sender).await;
        });
        Box::pin(UnboundedReceiverStream::new(receiver).map(|message| message.to_string()))
    }

    /// Register a task without probing; one reply.
    pub async fn add(&self, link: &str) -> String {
        let Some(id) = extract_identifier(link) else {
            warn!("add rejected: link has no btih info hash");
            return ProbeMessage::InvalidLink.to_string();
        };
        let options = self.orchestrator.options();
        let request = AddTask {
            uri: link.trim().to_string(),
            tags: vec![options.tag.clone()],
            save_path: self.add_save_path.clone(),
        };
        if let Err(err) = self.engine.add_task(request).await {
            let detail = err.describe();
            warn!(info_hash = %id, error = %detail, "task registration failed");
            return format!("failed to add task: {detail}");
        }
        info!(info_hash = %id, "task submitted");
        let mut reply = format!("task submitted to the engine: {id}");

        if !options.trackers.is_empty() {
            sleep(options.timing.settle_delay).await;
            let injected = match self.engine.add_trackers(&id, &options.trackers).await {
                Ok(()) => self.engine.reannounce(&id).await,
                Err(err) => Err(err),
            };
            match injected {
                Ok(()) => info!(info_hash = %id, count = options.trackers.len(), "trackers injected"),
                Err(err) => {
                    let detail = err.describe();
                    warn!(info_hash = %id, error = %detail, "tracker injection failed");
                    reply.push_str(&format!(
                        "\nwarning: tracker injection failed ({detail}); the task keeps its existing trackers"
                    ));
                }
            }
        }
        reply
    }

    /// Status of one task; one reply.
    pub async fn info(&self, identifier: &str) -> String {
        let parsed = if identifier.trim_start().starts_with("magnet:") {
            extract_identifier(identifier)
        } else {
            InfoHash::from_str(identifier).ok()
        };
        let Some(id) = parsed else {
            return format!("invalid identifier '{}'", identifier.trim());
        };
        match self.engine.query_task(&id).await {
            Ok(Some(snapshot)) => render_existing_task_report(&snapshot),
            Ok(None) => format!("no task found: {id}"),
            Err(err) => {
                let detail = err.describe();
                warn!(info_hash = %id, error = %detail, "status query failed");
                format!("engine unavailable: {detail}")
            }
        }
    }

    /// Re-establish the engine session; one reply.
    pub async fn relogin(&self) -> String {
        match self.session.relogin().await {
            Ok(version) => format!(
                "connected to engine {} (web API {})",
                version.application, version.web_api
            ),
            Err(err) => format!("relogin failed: {}", err.describe()),
        }
    }
}
