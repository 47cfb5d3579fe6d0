//! Interactive shell: one line per command, each run in its own task.

use std::sync::Arc;

use anyhow::Context;
use swarmprobe_app::{Command, CommandAdapter, HELP};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tracing::{info, warn};

const BANNER: &str = "swarmprobe shell; type 'help' for commands";

#[derive(Debug, PartialEq, Eq)]
enum ShellAction {
    Skip,
    Quit,
    Reply(String),
    Run(Command),
}

fn classify(line: &str) -> ShellAction {
    if line.trim().is_empty() {
        return ShellAction::Skip;
    }
    match line.parse::<Command>() {
        Ok(Command::Quit) => ShellAction::Quit,
        Ok(Command::Help) => ShellAction::Reply(HELP.to_string()),
        Ok(command) => ShellAction::Run(command),
        Err(err) => ShellAction::Reply(err.reply()),
    }
}

/// Prefix every line of `reply` with the invocation number.
fn tag_reply(invocation: u64, reply: &str) -> String {
    reply
        .lines()
        .map(|line| format!("[{invocation}] {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read commands from stdin until `quit` or end of input.
pub(crate) async fn run(commands: Arc<CommandAdapter>) -> anyhow::Result<()> {
    println!("{BANNER}");
    serve(BufReader::new(tokio::io::stdin()), commands).await
}

async fn serve<R>(reader: R, commands: Arc<CommandAdapter>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut running = JoinSet::new();
    let mut invocation: u64 = 0;

    while let Some(line) = lines.next_line().await.context("failed to read command")? {
        while let Some(finished) = running.try_join_next() {
            log_join(finished);
        }
        match classify(&line) {
            ShellAction::Skip => {}
            ShellAction::Quit => break,
            ShellAction::Reply(text) => println!("{text}"),
            ShellAction::Run(command) => {
                invocation += 1;
                let id = invocation;
                let commands = Arc::clone(&commands);
                info!(invocation = id, command = command.name(), "command started");
                running.spawn(async move {
                    let mut replies = commands.execute(command).await;
                    while let Some(reply) = replies.next().await {
                        println!("{}", tag_reply(id, &reply));
                    }
                });
            }
        }
    }

    if !running.is_empty() {
        info!(pending = running.len(), "waiting for running commands to finish");
    }
    while let Some(finished) = running.join_next().await {
        log_join(finished);
    }
    Ok(())
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        warn!(error = %err, "command task ended abnormally");
    }
}
