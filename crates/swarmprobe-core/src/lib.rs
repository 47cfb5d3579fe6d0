#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Engine-agnostic swarm probe interfaces and value types.
//!
//! Layout: `magnet.rs` (info-hash extraction), `model/` (snapshots and
//! requests exchanged with an engine), `service/` (the `EngineClient` seam),
//! `error.rs` (engine failure taxonomy).

pub mod error;
pub mod magnet;
pub mod model;
pub mod service;

pub use error::{EngineError, EngineResult};
pub use magnet::{InfoHash, InvalidInfoHash, extract_identifier};
pub use model::{AddTask, EngineVersion, METADATA_STATES, TaskFile, TaskSnapshot};
pub use service::{EngineClient, SessionControl};
