//! Value types exchanged with a download engine.

/// Engine state labels meaning "still resolving metadata from peers".
pub const METADATA_STATES: [&str; 2] = ["metaDL", "forcedMetaDL"];

/// Request payload for registering a task by magnet URI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddTask {
    /// Magnet URI handed to the engine verbatim.
    pub uri: String,
    /// Labels attached to the task so it can be recognized later.
    pub tags: Vec<String>,
    /// Optional override of the engine's default save location.
    pub save_path: Option<String>,
}

/// Point-in-time view of one task as reported by the engine.
///
/// Every query yields a fresh value; nothing mutates a snapshot after it is built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskSnapshot {
    /// Display name (the info hash until metadata resolves).
    pub name: String,
    /// Engine-defined state label.
    pub state: String,
    /// Total payload size in bytes; zero before metadata is known.
    pub total_size: u64,
    /// Seeds currently connected.
    pub seeds_connected: u64,
    /// Leechers currently connected.
    pub leechers_connected: u64,
    /// Complete peers discovered across the swarm.
    pub seeds_in_swarm: u64,
    /// Incomplete peers discovered across the swarm.
    pub leechers_in_swarm: u64,
    /// Current download speed in bytes per second.
    pub download_speed: u64,
    /// Bytes downloaded since the task was registered.
    pub downloaded: u64,
    /// Distributed copies reachable across connected peers; `>= 1.0` means a full copy.
    pub availability: f64,
    /// Completion fraction in `[0, 1]`.
    pub progress: f64,
}

impl TaskSnapshot {
    /// Whether the engine still reports a metadata-fetching state.
    #[must_use]
    pub fn is_fetching_metadata(&self) -> bool {
        METADATA_STATES.contains(&self.state.as_str())
    }

    /// Metadata counts as resolved only once the state left metadata fetching
    /// and a non-zero size is known.
    #[must_use]
    pub fn metadata_resolved(&self) -> bool {
        !self.is_fetching_metadata() && self.total_size > 0
    }
}

/// A file entry inside a task's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFile {
    /// Path of the file relative to the task root.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
}

/// Versions reported by the engine after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineVersion {
    /// Application version string (e.g. `v4.6.2`).
    pub application: String,
    /// Web API version string (e.g. `2.9.3`).
    pub web_api: String,
}
