//! Process start-up: configuration, logging, engine connection, command adapter.

use std::path::Path;
use std::sync::Arc;

use swarmprobe_config::{LoggingSettings, ProbeConfig};
use swarmprobe_core::{EngineClient, SessionControl};
use swarmprobe_qbit::EngineConnection;
use swarmprobe_telemetry::{LogFormat, LoggingConfig};
use tracing::{info, warn};

use crate::commands::CommandAdapter;
use crate::error::{AppError, AppResult};

/// Long-lived handles shared by every command.
pub struct AppContext {
    /// Command executor over the shared engine connection.
    pub commands: Arc<CommandAdapter>,
}

/// Load configuration from `path`, or the default file, plus environment.
///
/// # Errors
///
/// Returns an error when the configuration is unreadable or invalid.
pub fn load_config(path: Option<&Path>) -> AppResult<ProbeConfig> {
    ProbeConfig::load(path).map_err(|err| AppError::config("config.load", err))
}

/// Install the global subscriber described by `settings`.
///
/// # Errors
///
/// Returns an error for an unknown format or when a subscriber is already installed.
pub fn init_logging(settings: &LoggingSettings) -> AppResult<()> {
    let format: LogFormat = settings
        .format
        .parse()
        .map_err(|err| AppError::telemetry("logging.format", err))?;
    let logging = LoggingConfig {
        level: &settings.level,
        format,
        build_sha: option_env!("SWARMPROBE_BUILD_SHA").unwrap_or("dev"),
    };
    swarmprobe_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("logging.init", err))
}

/// Connect to the engine and build the command adapter.
///
/// A failed connection is logged and leaves the session unset; the first
/// command that needs the engine retries the login once.
pub async fn connect(config: &ProbeConfig) -> AppContext {
    let connection = Arc::new(EngineConnection::new(config.engine.clone()));
    match connection.connect().await {
        Ok(version) => info!(
            application = %version.application,
            web_api = %version.web_api,
            "engine ready"
        ),
        Err(_) => warn!("starting without an engine session"),
    }
    let engine: Arc<dyn EngineClient> = Arc::clone(&connection) as Arc<dyn EngineClient>;
    let session: Arc<dyn SessionControl> = Arc::clone(&connection) as Arc<dyn SessionControl>;
    let commands = Arc::new(CommandAdapter::new(engine, session, &config.probe));
    AppContext { commands }
}
