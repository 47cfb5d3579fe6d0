#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! qBittorrent WebUI adapter implementing [`swarmprobe_core::EngineClient`].
//!
//! Layout: `client.rs` (one authenticated session), `connection.rs` (shared
//! handle with connect and relogin), `types.rs` (wire shapes), `error.rs`
//! (HTTP failure mapping).

mod client;
mod connection;
mod error;
mod types;

pub use client::QbitClient;
pub use connection::EngineConnection;
