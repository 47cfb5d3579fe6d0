//! Typed configuration document.

use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};

/// Complete configuration, immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Download engine endpoint and credentials.
    pub engine: EngineSettings,
    /// Probe timing, trackers and save paths.
    pub probe: ProbeSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

/// Connection settings for the qBittorrent WebUI.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Host name, address, or full base URL (`https://seedbox.example/qbt`).
    pub host: String,
    /// Port used when `host` does not carry one.
    pub port: u16,
    /// WebUI user name.
    pub username: String,
    /// WebUI password.
    pub password: String,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            host: defaults::ENGINE_HOST.to_string(),
            port: defaults::ENGINE_PORT,
            username: defaults::ENGINE_USERNAME.to_string(),
            password: String::new(),
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Debug for EngineSettings {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EngineSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl EngineSettings {
    /// Base URL of the WebUI, always ending in `/` so API paths can be joined onto it.
    ///
    /// # Errors
    ///
    /// Returns an error when `host` cannot be turned into an HTTP(S) URL.
    pub fn base_url(&self) -> ConfigResult<Url> {
        let host = self.host.trim();
        let raw = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        let mut url = Url::parse(&raw).map_err(|_| {
            ConfigError::invalid("engine", "host", Some(self.host.clone()), "not_a_url")
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "engine",
                "host",
                Some(self.host.clone()),
                "unsupported_scheme",
            ));
        }
        if url.port().is_none() && url.set_port(Some(self.port)).is_err() {
            return Err(ConfigError::invalid(
                "engine",
                "host",
                Some(self.host.clone()),
                "cannot_carry_port",
            ));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// HTTP timeout applied to each engine request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Probe behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeSettings {
    /// Length of the throughput measurement window.
    pub measurement_window_secs: u64,
    /// Budget for metadata resolution.
    pub metadata_timeout_secs: u64,
    /// Interval between metadata polls.
    pub poll_interval_secs: u64,
    /// Pause between registration and the first follow-up call.
    pub settle_delay_ms: u64,
    /// Supplementary tracker URLs injected into every registered task.
    pub trackers: Vec<String>,
    /// Save path override for probe tasks.
    pub save_path: Option<String>,
    /// Save path override for tasks registered with `add`.
    pub add_save_path: Option<String>,
    /// Tag attached to every task this tool registers.
    pub tag: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            measurement_window_secs: defaults::MEASUREMENT_WINDOW_SECS,
            metadata_timeout_secs: defaults::METADATA_TIMEOUT_SECS,
            poll_interval_secs: defaults::POLL_INTERVAL_SECS,
            settle_delay_ms: defaults::SETTLE_DELAY_MS,
            trackers: Vec::new(),
            save_path: None,
            add_save_path: None,
            tag: defaults::TASK_TAG.to_string(),
        }
    }
}

impl ProbeSettings {
    /// Measurement window as a duration.
    #[must_use]
    pub const fn measurement_window(&self) -> Duration {
        Duration::from_secs(self.measurement_window_secs)
    }

    /// Metadata budget as a duration.
    #[must_use]
    pub const fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    /// Poll interval as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Settle delay as a duration.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Level filter used when `RUST_LOG` is unset.
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: defaults::LOG_FORMAT.to_string(),
        }
    }
}
