//! Argument parsing, start-up and one-shot command dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use swarmprobe_app::{AppContext, Command, ReplyStream};
use swarmprobe_config::ProbeConfig;
use swarmprobe_telemetry::GlobalContextGuard;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::error::{CliError, CliResult};
use crate::shell;

/// Parses CLI arguments, loads configuration, connects to the engine and
/// executes the requested command. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let label = command_label(&cli.command);

    let config = match prepare(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    let _context = GlobalContextGuard::new(label);
    debug!(command = label, "dispatching command");

    let context = swarmprobe_app::connect(&config).await;
    match dispatch(cli.command, &context).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn prepare(cli: &Cli) -> CliResult<ProbeConfig> {
    let mut config = swarmprobe_app::load_config(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if let Some(format) = &cli.log_format {
        config.logging.format.clone_from(format);
    }
    swarmprobe_app::init_logging(&config.logging)?;
    Ok(config)
}

async fn dispatch(command: CliCommand, context: &AppContext) -> CliResult<()> {
    let command = match command {
        CliCommand::Shell => {
            return shell::run(Arc::clone(&context.commands))
                .await
                .map_err(CliError::failure);
        }
        CliCommand::Probe(args) => Command::Probe { link: args.link },
        CliCommand::Add(args) => Command::Add { link: args.link },
        CliCommand::Info(args) => Command::Info {
            identifier: args.identifier,
        },
        CliCommand::Relogin => Command::Relogin,
    };
    print_replies(context.commands.execute(command).await).await;
    Ok(())
}

async fn print_replies(mut replies: ReplyStream) {
    while let Some(reply) = replies.next().await {
        println!("{reply}");
    }
}

#[derive(Parser)]
#[command(
    name = "swarmprobe",
    version,
    about = "Probe BitTorrent swarm health through a qBittorrent WebUI"
)]
struct Cli {
    #[arg(long, global = true, env = "SWARMPROBE_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override logging.level (tracing filter syntax)")]
    log_level: Option<String>,
    #[arg(
        long,
        global = true,
        value_parser = ["pretty", "text", "json"],
        help = "Override logging.format"
    )]
    log_format: Option<String>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Register a magnet link, measure its swarm and remove it again.
    #[command(visible_alias = "magtest")]
    Probe(LinkArgs),
    /// Register a magnet link and leave it running.
    #[command(visible_alias = "magadd")]
    Add(LinkArgs),
    /// Show the status of a registered task.
    #[command(visible_alias = "maginfo")]
    Info(InfoArgs),
    /// Re-establish the engine session.
    Relogin,
    /// Read commands from stdin, running each concurrently.
    Shell,
}

#[derive(Args)]
struct LinkArgs {
    /// Magnet link carrying a btih info hash.
    link: String,
}

#[derive(Args)]
struct InfoArgs {
    /// Info hash or magnet link.
    identifier: String,
}

const fn command_label(command: &CliCommand) -> &'static str {
    match command {
        CliCommand::Probe(_) => "probe",
        CliCommand::Add(_) => "add",
        CliCommand::Info(_) => "info",
        CliCommand::Relogin => "relogin",
        CliCommand::Shell => "shell",
    }
}
