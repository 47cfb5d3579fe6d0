//! Transient-task probe: register, resolve metadata, measure, report, clean up.
//!
//! # Design
//!
//! - One [`ProbeSession`] per invocation; nothing is shared between sessions
//!   except the engine handle and the immutable [`ProbeOptions`].
//! - Progress is streamed as [`ProbeMessage`] values while the probe runs.
//! - Engine failures are caught at the call site and classified; none escape.
//! - A task registered by the probe is owned by a [`RegisteredTask`] guard that
//!   is released (deleted with data) on every path after registration.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use swarmprobe_config::ProbeSettings;
use swarmprobe_core::{AddTask, EngineClient, InfoHash, TaskFile, TaskSnapshot, extract_identifier};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Instant, sleep};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::report::{
    FILE_PREVIEW_LIMIT, render_existing_task_report, render_file_list, render_final_report,
    render_metadata_report,
};

/// Waits applied by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTiming {
    /// Pause after registration before the task is addressed again.
    pub settle_delay: Duration,
    /// Interval between metadata polls.
    pub poll_interval: Duration,
    /// Budget for metadata resolution.
    pub metadata_timeout: Duration,
    /// Measurement window slept through before the final snapshot.
    pub measurement_window: Duration,
}

impl Default for ProbeTiming {
    fn default() -> Self {
        Self::from_settings(&ProbeSettings::default())
    }
}

impl ProbeTiming {
    /// Timing taken from configuration.
    #[must_use]
    pub const fn from_settings(settings: &ProbeSettings) -> Self {
        Self {
            settle_delay: settings.settle_delay(),
            poll_interval: settings.poll_interval(),
            metadata_timeout: settings.metadata_timeout(),
            measurement_window: settings.measurement_window(),
        }
    }
}

/// Immutable inputs shared by every probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Waits and budgets.
    pub timing: ProbeTiming,
    /// Supplementary trackers injected after registration.
    pub trackers: Vec<String>,
    /// Save path override for probe tasks.
    pub save_path: Option<String>,
    /// Tag attached to registered tasks.
    pub tag: String,
}

impl ProbeOptions {
    /// Options taken from configuration.
    #[must_use]
    pub fn from_settings(settings: &ProbeSettings) -> Self {
        Self {
            timing: ProbeTiming::from_settings(settings),
            trackers: settings.trackers.clone(),
            save_path: settings.save_path.clone(),
            tag: settings.tag.clone(),
        }
    }
}

/// One probe invocation. Lives only while the probe runs.
#[derive(Debug, Clone)]
pub struct ProbeSession {
    /// Correlation id used in logs.
    pub id: Uuid,
    /// Magnet link as supplied, registered verbatim.
    pub link: String,
    /// Task the session addresses.
    pub info_hash: InfoHash,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Metadata budget for this session.
    pub metadata_timeout: Duration,
    /// Measurement window for this session.
    pub measurement_window: Duration,
    /// Save path used at registration.
    pub save_path: Option<String>,
    /// Trackers injected after registration.
    pub trackers: Vec<String>,
}

impl ProbeSession {
    fn start(link: &str, info_hash: InfoHash, options: &ProbeOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            link: link.trim().to_string(),
            info_hash,
            started_at: Utc::now(),
            metadata_timeout: options.timing.metadata_timeout,
            measurement_window: options.timing.measurement_window,
            save_path: options.save_path.clone(),
            trackers: options.trackers.clone(),
        }
    }
}

/// Why metadata never resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutCause {
    /// The engine never returned a snapshot for the task.
    NoSnapshot,
    /// Snapshots arrived but stayed in metadata fetching or reported no size.
    NeverResolved,
}

impl TimeoutCause {
    const fn hint(self) -> &'static str {
        match self {
            Self::NoSnapshot => {
                "the engine never reported the task; it may have failed to register"
            }
            Self::NeverResolved => {
                "the task never left metadata fetching; the swarm likely has no seeders"
            }
        }
    }
}

/// Progress and result messages emitted while a probe runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeMessage {
    /// Identifier extracted; the probe is starting.
    Started {
        /// Target task.
        info_hash: InfoHash,
    },
    /// The link carried no info hash.
    InvalidLink,
    /// The existence check could not reach the engine.
    EngineUnavailable {
        /// Failure description.
        detail: String,
    },
    /// The task was already registered; nothing was changed.
    ExistingTask {
        /// Current state of the task.
        snapshot: TaskSnapshot,
    },
    /// Registration failed.
    AddFailed {
        /// Failure description.
        detail: String,
    },
    /// Tracker injection failed; the probe continues.
    TrackerWarning {
        /// Failure description.
        detail: String,
    },
    /// Metadata resolved.
    MetadataReady {
        /// Snapshot that reported the resolved metadata.
        snapshot: TaskSnapshot,
    },
    /// First files of the resolved task.
    Files {
        /// Up to the preview limit of files.
        files: Vec<TaskFile>,
        /// Number of files in the task.
        total: usize,
    },
    /// Metadata did not resolve within budget.
    MetadataTimeout {
        /// Budget that elapsed.
        after: Duration,
        /// Probable cause.
        cause: TimeoutCause,
    },
    /// Health report at the end of the measurement window.
    FinalReport {
        /// Snapshot taken at window end.
        snapshot: TaskSnapshot,
        /// Window length.
        window: Duration,
        /// Bytes gained between metadata resolution and window end.
        downloaded: u64,
    },
}

impl Display for ProbeMessage {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { info_hash } => write!(formatter, "probe started for {info_hash}"),
            Self::InvalidLink => {
                formatter.write_str("invalid magnet link: no btih info hash found")
            }
            Self::EngineUnavailable { detail } => {
                write!(formatter, "engine unavailable: {detail}")
            }
            Self::ExistingTask { snapshot } => write!(
                formatter,
                "task already registered; leaving it untouched\n{}",
                render_existing_task_report(snapshot)
            ),
            Self::AddFailed { detail } => write!(formatter, "failed to add task: {detail}"),
            Self::TrackerWarning { detail } => write!(
                formatter,
                "warning: tracker injection failed ({detail}); continuing with existing trackers"
            ),
            Self::MetadataReady { snapshot } => {
                formatter.write_str(&render_metadata_report(snapshot))
            }
            Self::Files { files, total } => {
                formatter.write_str(&render_file_list(files, *total))
            }
            Self::MetadataTimeout { after, cause } => write!(
                formatter,
                "metadata timed out after {}s: {}",
                after.as_secs(),
                cause.hint()
            ),
            Self::FinalReport {
                snapshot,
                window,
                downloaded,
            } => formatter.write_str(&render_final_report(snapshot, *window, *downloaded)),
        }
    }
}

/// Terminal failure of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    /// No identifier in the link; nothing was contacted.
    InvalidLink,
    /// The existence check failed; nothing was registered.
    EngineUnavailable,
    /// Registration failed; nothing to clean up.
    AddFailed,
    /// Metadata never resolved; the task was cleaned up.
    MetadataTimeout(TimeoutCause),
}

/// Terminal state of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A pre-existing task was reported and left untouched.
    ExistingTask,
    /// The probe ran to the end; `reported` is false when the task vanished before the final query.
    Completed {
        /// Whether a final report was emitted.
        reported: bool,
    },
    /// The probe stopped early.
    Failed(ProbeFailure),
}

impl ProbeOutcome {
    const fn label(self) -> &'static str {
        match self {
            Self::ExistingTask => "existing_task",
            Self::Completed { reported: true } => "completed",
            Self::Completed { reported: false } => "task_vanished",
            Self::Failed(ProbeFailure::InvalidLink) => "invalid_link",
            Self::Failed(ProbeFailure::EngineUnavailable) => "engine_unavailable",
            Self::Failed(ProbeFailure::AddFailed) => "add_failed",
            Self::Failed(ProbeFailure::MetadataTimeout(_)) => "metadata_timeout",
        }
    }
}

/// Task registered by a probe; must be released with [`RegisteredTask::release`].
///
/// Dropping an unreleased guard (cancelled probe, panic) leaves the task at
/// the engine and logs it so the orphan can be removed by hand.
struct RegisteredTask {
    engine: Arc<dyn EngineClient>,
    info_hash: InfoHash,
    released: bool,
}

impl RegisteredTask {
    const fn new(engine: Arc<dyn EngineClient>, info_hash: InfoHash) -> Self {
        Self {
            engine,
            info_hash,
            released: false,
        }
    }

    async fn release(mut self) {
        self.released = true;
        match self.engine.delete_task(&self.info_hash, true).await {
            Ok(()) => info!(info_hash = %self.info_hash, "probe task removed with its data"),
            Err(err) => warn!(
                info_hash = %self.info_hash,
                error = %err.describe(),
                "failed to remove probe task"
            ),
        }
    }
}

impl Drop for RegisteredTask {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                info_hash = %self.info_hash,
                "probe ended without cleanup; the task remains registered at the engine"
            );
        }
    }
}

fn emit(sink: &UnboundedSender<ProbeMessage>, message: ProbeMessage) {
    if sink.send(message).is_err() {
        debug!("probe message dropped; receiver closed");
    }
}

/// Drives probes against an engine.
pub struct ProbeOrchestrator {
    engine: Arc<dyn EngineClient>,
    options: ProbeOptions,
}

impl ProbeOrchestrator {
    /// Build an orchestrator over `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn EngineClient>, options: ProbeOptions) -> Self {
        Self { engine, options }
    }

    /// Options applied to every probe.
    #[must_use]
    pub const fn options(&self) -> &ProbeOptions {
        &self.options
    }

    /// Probe `link`, streaming messages to `sink`, and return the terminal state.
    ///
    /// The probe runs to completion even when the receiver is dropped, so a
    /// registered task is always cleaned up.
    pub async fn probe(&self, link: &str, sink: &UnboundedSender<ProbeMessage>) -> ProbeOutcome {
        let Some(info_hash) = extract_identifier(link) else {
            warn!("probe rejected: link has no btih info hash");
            emit(sink, ProbeMessage::InvalidLink);
            return ProbeOutcome::Failed(ProbeFailure::InvalidLink);
        };

        let session = ProbeSession::start(link, info_hash, &self.options);
        let span = info_span!(
            "probe",
            session_id = %session.id,
            info_hash = %session.info_hash
        );
        let outcome = self.run_session(&session, sink).instrument(span.clone()).await;
        span.in_scope(|| {
            info!(
                outcome = outcome.label(),
                elapsed_secs = (Utc::now() - session.started_at).num_seconds(),
                "probe finished"
            );
        });
        outcome
    }

    async fn run_session(
        &self,
        session: &ProbeSession,
        sink: &UnboundedSender<ProbeMessage>,
    ) -> ProbeOutcome {
        let id = &session.info_hash;
        info!("probe started");
        emit(
            sink,
            ProbeMessage::Started {
                info_hash: id.clone(),
            },
        );

        match self.engine.query_task(id).await {
            Ok(Some(snapshot)) => {
                info!(state = %snapshot.state, "task already registered; leaving it untouched");
                emit(sink, ProbeMessage::ExistingTask { snapshot });
                return ProbeOutcome::ExistingTask;
            }
            Ok(None) => {}
            Err(err) => {
                let detail = err.describe();
                warn!(error = %detail, "existence check failed");
                emit(sink, ProbeMessage::EngineUnavailable { detail });
                return ProbeOutcome::Failed(ProbeFailure::EngineUnavailable);
            }
        }

        let request = AddTask {
            uri: session.link.clone(),
            tags: vec![self.options.tag.clone()],
            save_path: session.save_path.clone(),
        };
        if let Err(err) = self.engine.add_task(request).await {
            let detail = err.describe();
            warn!(error = %detail, "task registration failed");
            emit(sink, ProbeMessage::AddFailed { detail });
            return ProbeOutcome::Failed(ProbeFailure::AddFailed);
        }
        info!("task registered");

        let task = RegisteredTask::new(Arc::clone(&self.engine), id.clone());
        let outcome = self.observe(session, sink).await;
        task.release().await;
        outcome
    }

    /// Everything between registration and cleanup.
    async fn observe(
        &self,
        session: &ProbeSession,
        sink: &UnboundedSender<ProbeMessage>,
    ) -> ProbeOutcome {
        let id = &session.info_hash;
        sleep(self.options.timing.settle_delay).await;

        if !session.trackers.is_empty() {
            self.inject_trackers(id, &session.trackers, sink).await;
        }

        let snapshot = match self.await_metadata(id, session.metadata_timeout).await {
            Ok(snapshot) => snapshot,
            Err(cause) => {
                warn!(?cause, "metadata did not resolve in time");
                emit(
                    sink,
                    ProbeMessage::MetadataTimeout {
                        after: session.metadata_timeout,
                        cause,
                    },
                );
                return ProbeOutcome::Failed(ProbeFailure::MetadataTimeout(cause));
            }
        };
        info!(name = %snapshot.name, total_size = snapshot.total_size, "metadata resolved");
        let baseline = snapshot.downloaded;
        emit(sink, ProbeMessage::MetadataReady { snapshot });

        self.preview_files(id, sink).await;

        info!(
            window_secs = session.measurement_window.as_secs(),
            "measuring throughput"
        );
        sleep(session.measurement_window).await;

        match self.engine.query_task(id).await {
            Ok(Some(snapshot)) => {
                let downloaded = snapshot.downloaded.saturating_sub(baseline);
                info!(
                    availability = snapshot.availability,
                    download_speed = snapshot.download_speed,
                    downloaded,
                    "measurement complete"
                );
                emit(
                    sink,
                    ProbeMessage::FinalReport {
                        snapshot,
                        window: session.measurement_window,
                        downloaded,
                    },
                );
                ProbeOutcome::Completed { reported: true }
            }
            Ok(None) => {
                warn!("task vanished before the final snapshot; no report");
                ProbeOutcome::Completed { reported: false }
            }
            Err(err) => {
                warn!(error = %err.describe(), "final snapshot unavailable; no report");
                ProbeOutcome::Completed { reported: false }
            }
        }
    }

    async fn inject_trackers(
        &self,
        id: &InfoHash,
        trackers: &[String],
        sink: &UnboundedSender<ProbeMessage>,
    ) {
        info!(count = trackers.len(), "injecting trackers");
        let result = match self.engine.add_trackers(id, trackers).await {
            Ok(()) => self.engine.reannounce(id).await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            let detail = err.describe();
            warn!(error = %detail, "tracker injection failed; continuing");
            emit(sink, ProbeMessage::TrackerWarning { detail });
        }
    }

    /// Poll until metadata resolves or `budget` elapses.
    ///
    /// A poll runs immediately, then every poll interval; the last sleep is
    /// shortened so the deadline is checked right when the budget runs out.
    async fn await_metadata(
        &self,
        id: &InfoHash,
        budget: Duration,
    ) -> Result<TaskSnapshot, TimeoutCause> {
        let started = Instant::now();
        let mut seen_snapshot = false;
        let mut poll: u32 = 0;
        loop {
            poll += 1;
            match self.engine.query_task(id).await {
                Ok(Some(snapshot)) if snapshot.metadata_resolved() => return Ok(snapshot),
                Ok(Some(snapshot)) => {
                    seen_snapshot = true;
                    debug!(
                        poll,
                        elapsed_secs = started.elapsed().as_secs(),
                        state = %snapshot.state,
                        seeds = snapshot.seeds_connected,
                        leechers = snapshot.leechers_connected,
                        "waiting for metadata"
                    );
                }
                Ok(None) => debug!(poll, "no snapshot yet"),
                Err(err) => debug!(poll, error = %err.describe(), "metadata poll failed"),
            }

            let elapsed = started.elapsed();
            if elapsed >= budget {
                return Err(if seen_snapshot {
                    TimeoutCause::NeverResolved
                } else {
                    TimeoutCause::NoSnapshot
                });
            }
            sleep(self.options.timing.poll_interval.min(budget - elapsed)).await;
        }
    }

    async fn preview_files(&self, id: &InfoHash, sink: &UnboundedSender<ProbeMessage>) {
        match self.engine.list_files(id).await {
            Ok(files) => {
                let total = files.len();
                for file in files.iter().take(FILE_PREVIEW_LIMIT) {
                    debug!(name = %file.name, size = file.size, "task file");
                }
                let files = files.into_iter().take(FILE_PREVIEW_LIMIT).collect();
                emit(sink, ProbeMessage::Files { files, total });
            }
            Err(err) => warn!(error = %err.describe(), "file listing failed"),
        }
    }
}
