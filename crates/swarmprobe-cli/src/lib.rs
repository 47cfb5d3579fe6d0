#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Command-line front end for the swarm health probe.
//!
//! Layout:
//! - `cli.rs`: argument parsing, start-up and one-shot dispatch
//! - `shell.rs`: interactive loop hosting concurrent commands
//! - `error.rs`: CLI error type and exit codes
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod error;
pub(crate) mod shell;

pub use cli::run;
