//! Configuration sources: YAML file first, then environment overrides.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::model::ProbeConfig;
use crate::validate::validate;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "swarmprobe.yaml";
/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "SWARMPROBE_";

impl ProbeConfig {
    /// Load, overlay process environment, and validate.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// read when present and defaults are used otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, an override is
    /// malformed, or validation fails.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Same as [`ProbeConfig::load`] with an injectable environment lookup.
    ///
    /// # Errors
    ///
    /// See [`ProbeConfig::load`].
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::from_file(Path::new(DEFAULT_CONFIG_FILE)) {
                Ok(config) => config,
                Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    debug!("no configuration file found; using defaults");
                    Self::default()
                }
                Err(err) => return Err(err),
            },
        };
        config.apply_env_overrides(lookup)?;
        validate(&config)?;
        info!(
            engine_host = %config.engine.host,
            engine_port = config.engine.port,
            trackers = config.probe.trackers.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse a YAML file without applying overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is unreadable or malformed.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path.to_path_buf())
    }

    /// Parse a YAML document held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error when the document does not match the schema.
    pub fn from_yaml_str(raw: &str) -> ConfigResult<Self> {
        Self::parse(raw, PathBuf::from("<inline>"))
    }

    fn parse(raw: &str, path: PathBuf) -> ConfigResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Overlay `SWARMPROBE_ENGINE_*` values returned by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error when `SWARMPROBE_ENGINE_PORT` is not a port number.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

        if let Some(host) = var("ENGINE_HOST") {
            self.engine.host = host;
        }
        if let Some(port) = var("ENGINE_PORT") {
            self.engine.port = port.trim().parse().map_err(|_| {
                ConfigError::invalid("engine", "port", Some(port.clone()), "not_a_port")
            })?;
        }
        if let Some(username) = var("ENGINE_USERNAME") {
            self.engine.username = username;
        }
        if let Some(password) = var("ENGINE_PASSWORD") {
            self.engine.password = password;
        }
        Ok(())
    }
}
