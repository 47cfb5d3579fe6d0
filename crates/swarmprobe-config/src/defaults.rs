//! Default values for configuration fields.
//!
//! # Design
//! - Keep every default in one place so the model, docs and tests agree.

pub(crate) const ENGINE_HOST: &str = "127.0.0.1";
pub(crate) const ENGINE_PORT: u16 = 8080;
pub(crate) const ENGINE_USERNAME: &str = "admin";
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 10;

pub(crate) const MEASUREMENT_WINDOW_SECS: u64 = 30;
pub(crate) const METADATA_TIMEOUT_SECS: u64 = 60;
pub(crate) const POLL_INTERVAL_SECS: u64 = 2;
/// Pause after registration so the engine can create bookkeeping for the hash.
pub(crate) const SETTLE_DELAY_MS: u64 = 1_000;
pub(crate) const TASK_TAG: &str = "swarmprobe";

pub(crate) const LOG_LEVEL: &str = "info";
pub(crate) const LOG_FORMAT: &str = "pretty";
