//! Wire shapes returned by the qBittorrent WebUI and their conversion into core snapshots.

use serde::Deserialize;
use swarmprobe_core::{TaskFile, TaskSnapshot};

/// One element of `GET /api/v2/torrents/info`.
///
/// Counters that the engine reports as `-1` while the swarm is unknown are
/// decoded as signed values and clamped on conversion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct QbTorrentInfo {
    pub(crate) name: String,
    pub(crate) state: String,
    pub(crate) total_size: i64,
    pub(crate) num_seeds: i64,
    pub(crate) num_leechs: i64,
    pub(crate) num_complete: i64,
    pub(crate) num_incomplete: i64,
    pub(crate) dlspeed: i64,
    pub(crate) downloaded: i64,
    pub(crate) availability: f64,
    pub(crate) progress: f64,
}

/// One element of `GET /api/v2/torrents/files`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct QbTorrentFile {
    pub(crate) name: String,
    pub(crate) size: i64,
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl From<QbTorrentInfo> for TaskSnapshot {
    fn from(info: QbTorrentInfo) -> Self {
        Self {
            name: info.name,
            state: info.state,
            total_size: count(info.total_size),
            seeds_connected: count(info.num_seeds),
            leechers_connected: count(info.num_leechs),
            seeds_in_swarm: count(info.num_complete),
            leechers_in_swarm: count(info.num_incomplete),
            download_speed: count(info.dlspeed),
            downloaded: count(info.downloaded),
            availability: if info.availability.is_finite() {
                info.availability.max(0.0)
            } else {
                0.0
            },
            progress: info.progress,
        }
    }
}

impl From<QbTorrentFile> for TaskFile {
    fn from(file: QbTorrentFile) -> Self {
        Self {
            name: file.name,
            size: count(file.size),
        }
    }
}
