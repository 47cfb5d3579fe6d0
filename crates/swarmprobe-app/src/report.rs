//! Plain-text rendering of task snapshots.
//!
//! Pure formatting over values already fetched from the engine. Sizes are
//! binary megabytes labelled `MB` and speeds binary kilobytes per second.

use std::fmt::Write as _;
use std::time::Duration;

use swarmprobe_core::{TaskFile, TaskSnapshot};

/// Files listed after metadata resolves.
pub const FILE_PREVIEW_LIMIT: usize = 5;

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const HEALTHY_AVAILABILITY: f64 = 1.0;

/// Health classification derived from swarm availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    /// At least one full copy is reachable.
    Healthy,
    /// The reachable peers may not hold a complete copy.
    Warning,
}

impl HealthVerdict {
    /// Classify an availability ratio; exactly `1.0` is healthy.
    #[must_use]
    pub fn from_availability(availability: f64) -> Self {
        if availability >= HEALTHY_AVAILABILITY {
            Self::Healthy
        } else {
            Self::Warning
        }
    }

    /// Reply text for the verdict.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Healthy => "healthy, theoretically fully downloadable",
            Self::Warning => "warning: swarm may lack a complete copy",
        }
    }
}

/// Format a byte count as `{:.2} MB`.
#[must_use]
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes_to_f64(bytes) / MIB)
}

/// Format a byte rate as `{:.2} KB/s`.
#[must_use]
pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{:.2} KB/s", bytes_to_f64(bytes_per_second) / KIB)
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}

fn push_swarm_lines(text: &mut String, snapshot: &TaskSnapshot) {
    let _ = writeln!(text, "availability: {:.2}", snapshot.availability);
    let _ = writeln!(
        text,
        "seeds: {} connected / {} in swarm",
        snapshot.seeds_connected, snapshot.seeds_in_swarm
    );
    let _ = writeln!(
        text,
        "leechers: {} connected / {} in swarm",
        snapshot.leechers_connected, snapshot.leechers_in_swarm
    );
}

/// Current status of a task the probe did not create.
#[must_use]
pub fn render_existing_task_report(snapshot: &TaskSnapshot) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "task status: {}", snapshot.name);
    let _ = writeln!(text, "state: {}", snapshot.state);
    push_swarm_lines(&mut text, snapshot);
    let _ = write!(
        text,
        "download speed: {}",
        format_speed(snapshot.download_speed)
    );
    text
}

/// Announcement that metadata resolved.
#[must_use]
pub fn render_metadata_report(snapshot: &TaskSnapshot) -> String {
    format!(
        "metadata resolved\nname: {}\ntotal size: {}",
        snapshot.name,
        format_megabytes(snapshot.total_size)
    )
}

/// Up to [`FILE_PREVIEW_LIMIT`] files with their sizes, out of `total`.
#[must_use]
pub fn render_file_list(files: &[TaskFile], total: usize) -> String {
    let shown = files.len().min(FILE_PREVIEW_LIMIT);
    let mut text = format!("files (first {shown} of {total}):");
    for file in files.iter().take(FILE_PREVIEW_LIMIT) {
        let _ = write!(
            text,
            "\n  - {} ({})",
            file.name,
            format_megabytes(file.size)
        );
    }
    text
}

/// Final health report at the end of the measurement window.
///
/// `window_downloaded` is the byte count gained during the window, not the
/// engine's running total.
#[must_use]
pub fn render_final_report(
    snapshot: &TaskSnapshot,
    window: Duration,
    window_downloaded: u64,
) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "final report ({}s window)", window.as_secs());
    push_swarm_lines(&mut text, snapshot);
    let _ = writeln!(
        text,
        "download speed: {}",
        format_speed(snapshot.download_speed)
    );
    let _ = writeln!(
        text,
        "downloaded during window: {}",
        format_megabytes(window_downloaded)
    );
    let _ = write!(
        text,
        "verdict: {}",
        HealthVerdict::from_availability(snapshot.availability).describe()
    );
    text
}
