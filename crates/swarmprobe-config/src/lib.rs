#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! File-backed configuration loaded once at process start.
//!
//! Layout: `model.rs` (typed document and defaults), `loader.rs` (file and
//! environment sources), `validate.rs` (field checks), `error.rs`.

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{DEFAULT_CONFIG_FILE, ENV_PREFIX};
pub use model::{EngineSettings, LoggingSettings, ProbeConfig, ProbeSettings};
