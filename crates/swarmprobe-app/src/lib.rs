#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Swarm health probe orchestration and the command surface around it.
//!
//! Layout: `orchestrator.rs` (probe state machine and cleanup guard),
//! `report.rs` (text rendering), `commands.rs` (parsing and execution),
//! `bootstrap.rs` (start-up wiring), `error.rs`.

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod orchestrator;
pub mod report;

pub use bootstrap::{AppContext, connect, init_logging, load_config};
pub use commands::{Command, CommandAdapter, CommandParseError, HELP, ReplyStream};
pub use error::{AppError, AppResult};
pub use orchestrator::{
    ProbeFailure, ProbeMessage, ProbeOptions, ProbeOrchestrator, ProbeOutcome, ProbeSession,
    ProbeTiming, TimeoutCause,
};
pub use report::{HealthVerdict, format_megabytes, format_speed};
