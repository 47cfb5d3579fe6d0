//! Field-level validation for a loaded configuration document.

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{EngineSettings, LoggingSettings, ProbeConfig, ProbeSettings};

const TRACKER_SCHEMES: [&str; 4] = ["http", "https", "udp", "wss"];
const LOG_FORMATS: [&str; 3] = ["pretty", "text", "json"];

/// Validate every section of the document.
///
/// # Errors
///
/// Returns the first [`ConfigError::InvalidField`] encountered.
pub fn validate(config: &ProbeConfig) -> ConfigResult<()> {
    validate_engine(&config.engine)?;
    validate_probe(&config.probe)?;
    validate_logging(&config.logging)
}

fn validate_engine(engine: &EngineSettings) -> ConfigResult<()> {
    if engine.host.trim().is_empty() {
        return Err(ConfigError::invalid("engine", "host", None, "empty"));
    }
    if engine.port == 0 {
        return Err(ConfigError::invalid(
            "engine",
            "port",
            Some("0".to_string()),
            "must_be_nonzero",
        ));
    }
    if engine.request_timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "engine",
            "request_timeout_secs",
            Some("0".to_string()),
            "must_be_positive",
        ));
    }
    engine.base_url().map(|_| ())
}

fn validate_probe(probe: &ProbeSettings) -> ConfigResult<()> {
    if probe.metadata_timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "probe",
            "metadata_timeout_secs",
            Some("0".to_string()),
            "must_be_positive",
        ));
    }
    if probe.poll_interval_secs == 0 {
        return Err(ConfigError::invalid(
            "probe",
            "poll_interval_secs",
            Some("0".to_string()),
            "must_be_positive",
        ));
    }
    if probe.poll_interval_secs > probe.metadata_timeout_secs {
        return Err(ConfigError::invalid(
            "probe",
            "poll_interval_secs",
            Some(probe.poll_interval_secs.to_string()),
            "exceeds_metadata_timeout",
        ));
    }

    for tracker in &probe.trackers {
        let parsed = Url::parse(tracker.trim()).map_err(|_| {
            ConfigError::invalid("probe", "trackers", Some(tracker.clone()), "not_a_url")
        })?;
        if !TRACKER_SCHEMES.contains(&parsed.scheme()) {
            return Err(ConfigError::invalid(
                "probe",
                "trackers",
                Some(tracker.clone()),
                "unsupported_scheme",
            ));
        }
    }

    let tag = probe.tag.trim();
    if tag.is_empty() {
        return Err(ConfigError::invalid("probe", "tag", None, "empty"));
    }
    if tag.contains(',') {
        return Err(ConfigError::invalid(
            "probe",
            "tag",
            Some(probe.tag.clone()),
            "contains_comma",
        ));
    }

    for (field, path) in [
        ("save_path", &probe.save_path),
        ("add_save_path", &probe.add_save_path),
    ] {
        if path.as_deref().is_some_and(|value| value.trim().is_empty()) {
            return Err(ConfigError::invalid("probe", field, None, "empty"));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingSettings) -> ConfigResult<()> {
    if logging.level.trim().is_empty() {
        return Err(ConfigError::invalid("logging", "level", None, "empty"));
    }
    let format = logging.format.trim().to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        return Err(ConfigError::invalid(
            "logging",
            "format",
            Some(logging.format.clone()),
            "unknown_format",
        ));
    }
    Ok(())
}
