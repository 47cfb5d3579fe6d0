mod support;

use std::sync::Arc;
use std::time::Duration;

use swarmprobe_app::{
    ProbeFailure, ProbeMessage, ProbeOptions, ProbeOrchestrator, ProbeOutcome, ProbeTiming,
    TimeoutCause,
};
use swarmprobe_core::{AddTask, EngineClient};
use tokio::sync::mpsc;

use support::{Call, LINK, RecordingEngine, Reply, downloading, fetching_metadata};

fn options() -> ProbeOptions {
    ProbeOptions {
        timing: ProbeTiming {
            settle_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(2),
            metadata_timeout: Duration::from_secs(60),
            measurement_window: Duration::from_secs(30),
        },
        trackers: Vec::new(),
        save_path: None,
        tag: "swarmprobe".to_string(),
    }
}

async fn run(
    engine: &Arc<RecordingEngine>,
    options: ProbeOptions,
    link: &str,
) -> (ProbeOutcome, Vec<ProbeMessage>) {
    let client: Arc<dyn EngineClient> = Arc::clone(engine) as Arc<dyn EngineClient>;
    let orchestrator = ProbeOrchestrator::new(client, options);
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let outcome = orchestrator.probe(link, &sender).await;
    drop(sender);
    let mut messages = Vec::new();
    while let Some(message) = receiver.recv().await {
        messages.push(message);
    }
    (outcome, messages)
}

fn count(messages: &[ProbeMessage], matches: impl Fn(&ProbeMessage) -> bool) -> usize {
    messages.iter().filter(|message| matches(message)).count()
}

#[tokio::test(start_paused = true)]
async fn healthy_probe_reports_and_cleans_up_once() {
    let engine = Arc::new(RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(fetching_metadata()),
        Reply::Snapshot(fetching_metadata()),
        Reply::Snapshot(downloading(1.5)),
        Reply::Snapshot(downloading(1.5)),
    ]));

    let (outcome, messages) = run(&engine, options(), LINK).await;

    assert_eq!(outcome, ProbeOutcome::Completed { reported: true });
    let texts: Vec<String> = messages.iter().map(ToString::to_string).collect();
    assert!(matches!(messages.first(), Some(ProbeMessage::Started { .. })));
    let metadata = messages
        .iter()
        .position(|message| matches!(message, ProbeMessage::MetadataReady { .. }))
        .expect("metadata message");
    assert!(texts[metadata].contains("1.00 MB"));
    let report = messages
        .iter()
        .position(|message| matches!(message, ProbeMessage::FinalReport { .. }))
        .expect("final report");
    assert!(metadata < report);
    assert!(texts[report].contains("verdict: healthy"));
    assert_eq!(
        count(&messages, |m| matches!(m, ProbeMessage::Files { total: 1, .. })),
        1
    );

    assert_eq!(engine.deletes().await, vec![true]);
    let timed = engine.timed_calls().await;
    let (at, last) = timed.last().expect("calls recorded");
    assert_eq!(*last, Call::Delete { purge: true });
    assert_eq!(*at, Duration::from_secs(35));
}

#[tokio::test(start_paused = true)]
async fn registration_uses_link_tag_and_save_path() {
    let engine = Arc::new(RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(downloading(1.0)),
    ]));
    let options = ProbeOptions {
        save_path: Some("/downloads/probe".to_string()),
        ..options()
    };

    run(&engine, options, LINK).await;

    let adds: Vec<Call> = engine
        .calls()
        .await
        .into_iter()
        .filter(|call| matches!(call, Call::Add(_)))
        .collect();
    assert_eq!(
        adds,
        vec![Call::Add(AddTask {
            uri: LINK.to_string(),
            tags: vec!["swarmprobe".to_string()],
            save_path: Some("/downloads/probe".to_string()),
        })]
    );
}

#[tokio::test(start_paused = true)]
async fn metadata_timeout_cleans_up_without_final_report() {
    let engine = Arc::new(RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(fetching_metadata()),
    ]));

    let (outcome, messages) = run(&engine, options(), LINK).await;

    assert_eq!(
        outcome,
        ProbeOutcome::Failed(ProbeFailure::MetadataTimeout(TimeoutCause::NeverResolved))
    );
    assert_eq!(
        count(&messages, |m| matches!(m, ProbeMessage::MetadataTimeout { .. })),
        1
    );
    assert_eq!(
        count(&messages, |m| matches!(m, ProbeMessage::FinalReport { .. })),
        0
    );
    assert_eq!(engine.deletes().await, vec![true]);
    assert_eq!(engine.count(|call| *call == Call::ListFiles).await, 0);
    // existence check plus polls at 0, 2, ..., 60 seconds
    assert_eq!(engine.count(|call| *call == Call::Query).await, 32);

    let timed = engine.timed_calls().await;
    let (at, last) = timed.last().expect("calls recorded");
    assert_eq!(*last, Call::Delete { purge: true });
    assert_eq!(*at, Duration::from_secs(61));

    let timeout_text = messages
        .iter()
        .find(|m| matches!(m, ProbeMessage::MetadataTimeout { .. }))
        .map(ToString::to_string)
        .unwrap_or_default();
    assert!(timeout_text.contains("after 60s"));
    assert!(timeout_text.contains("no seeders"));
}

#[tokio::test(start_paused = true)]
async fn timeout_without_any_snapshot_names_registration() {
    let engine = Arc::new(RecordingEngine::with_replies([Reply::Missing]));

    let (outcome, messages) = run(&engine, options(), LINK).await;

    assert_eq!(
        outcome,
        ProbeOutcome::Failed(ProbeFailure::MetadataTimeout(TimeoutCause::NoSnapshot))
    );
    let text = messages
        .iter()
        .find(|m| matches!(m, ProbeMessage::MetadataTimeout { .. }))
        .map(ToString::to_string)
        .unwrap_or_default();
    assert!(text.contains("never reported the task"));
    assert_eq!(engine.deletes().await, vec![true]);
}

#[tokio::test(start_paused = true)]
async fn failed_polls_count_as_no_snapshot() {
    let engine = Arc::new(RecordingEngine::with_replies([Reply::Missing, Reply::Fail]));

    let (outcome, _) = run(&engine, options(), LINK).await;

    assert_eq!(
        outcome,
        ProbeOutcome::Failed(ProbeFailure::MetadataTimeout(TimeoutCause::NoSnapshot))
    );
    assert_eq!(engine.deletes().await, vec![true]);
}

#[tokio::test(start_paused = true)]
async fn deadline_is_checked_when_budget_is_not_a_multiple_of_interval() {
    let engine = Arc::new(RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(fetching_metadata()),
    ]));
    let mut options = options();
    options.timing.metadata_timeout = Duration::from_secs(5);

    run(&engine, options, LINK).await;

    // polls at 0, 2, 4 and 5 seconds after the settle delay
    assert_eq!(engine.count(|call| *call == Call::Query).await, 5);
    let timed = engine.timed_calls().await;
    let (at, _) = timed.last().expect("calls recorded");
    assert_eq!(*at, Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn metadata_requires_known_state_and_nonzero_size() {
    let sized_but_fetching = fetching_metadata_with_size();
    let resolved_state_no_size = {
        let mut snapshot = downloading(1.0);
        snapshot.total_size = 0;
        snapshot
    };
    let engine = Arc::new(RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(resolved_state_no_size),
        Reply::Snapshot(sized_but_fetching),
        Reply::Snapshot(downloading(1.0)),
    ]));

    let (outcome, messages) = run(&engine, options(), LINK).await;

    assert_eq!(outcome, ProbeOutcome::Completed { reported: true });
    let calls = engine.calls().await;
    let listing = calls
        .iter()
        .position(|call| *call == Call::ListFiles)
        .expect("files listed after metadata");
    assert_eq!(
        calls[..listing]
            .iter()
            .filter(|call| **call == Call::Query)
            .count(),
        4
    );
    let ready = messages.iter().find_map(|message| match message {
        ProbeMessage::MetadataReady { snapshot } => Some(snapshot.state.clone()),
        _ => None,
    });
    assert_eq!(ready.as_deref(), Some("downloading"));
}

fn fetching_metadata_with_size() -> swarmprobe_core::TaskSnapshot {
    let mut snapshot = fetching_metadata();
    snapshot.total_size = 1_048_576;
    snapshot
}

#[tokio::test(start_paused = true)]
async fn existing_task_is_reported_and_left_alone() {
    let engine = Arc::new(RecordingEngine::with_replies([Reply::Snapshot(
        downloading(2.0),
    )]));

    let (outcome, messages) = run(&engine, options(), LINK).await;

    assert_eq!(outcome, ProbeOutcome::ExistingTask);
    assert_eq!(engine.calls().await, vec![Call::Query]);
    assert_eq!(
        count(&messages, |m| matches!(m, ProbeMessage::ExistingTask { .. })),
        1
    );
    let text = messages.last().map(ToString::to_string).unwrap_or_default();
    assert!(text.contains("state: downloading"));
}

#[tokio::test(start_paused = true)]
async fn invalid_link_makes_no_engine_calls() {
    let engine = Arc::new(RecordingEngine::with_replies([]));

    let (outcome, messages) = run(&engine, options(), "not-a-magnet-link").await;

    assert_eq!(outcome, ProbeOutcome::Failed(ProbeFailure::InvalidLink));
    assert_eq!(messages, vec![ProbeMessage::InvalidLink]);
    assert!(engine.calls().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_existence_check_registers_nothing() {
    let engine = Arc::new(RecordingEngine::with_replies([Reply::Fail]));

    let (outcome, messages) = run(&engine, options(), LINK).await;

    assert_eq!(outcome, ProbeOutcome::Failed(ProbeFailure::EngineUnavailable));
    assert_eq!(engine.calls().await, vec![Call::Query]);
    assert!(matches!(
        messages.last(),
        Some(ProbeMessage::EngineUnavailable { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn add_failure_skips_cleanup() {
    let mut engine = RecordingEngine::with_replies([Reply::Missing]);
    engine.fail_add = true;
    let engine = Arc::new(engine);

    let (outcome, messages) = run(&engine, options(), LINK).await;

    assert_eq!(outcome, ProbeOutcome::Failed(ProbeFailure::AddFailed));
    assert!(engine.deletes().await.is_empty());
    let text = messages.last().map(ToString::to_string).unwrap_or_default();
    assert!(text.starts_with("failed to add task"));
    assert!(text.contains("Fails."));
}

#[tokio::test(start_paused = true)]
async fn trackers_are_injected_after_settle_delay() {
    let engine = Arc::new(RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(downloading(1.0)),
    ]));
    let trackers = vec![
        "udp://tracker.opentrackr.org:1337/announce".to_string(),
        "https://tracker.example/announce".to_string(),
    ];
    let options = ProbeOptions {
        trackers: trackers.clone(),
        ..options()
    };

    run(&engine, options, LINK).await;

    let timed = engine.timed_calls().await;
    let injection: Vec<&(Duration, Call)> = timed
        .iter()
        .filter(|(_, call)| matches!(call, Call::AddTrackers(_) | Call::Reannounce))
        .collect();
    assert_eq!(injection.len(), 2);
    assert_eq!(injection[0].1, Call::AddTrackers(trackers));
    assert_eq!(injection[0].0, Duration::from_secs(1));
    assert_eq!(injection[1].1, Call::Reannounce);
}

#[tokio::test(start_paused = true)]
async fn tracker_failure_is_a_warning() {
    let mut engine = RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(downloading(0.5)),
    ]);
    engine.fail_trackers = true;
    let engine = Arc::new(engine);
    let options = ProbeOptions {
        trackers: vec!["udp://tracker.example:6969/announce".to_string()],
        ..options()
    };

    let (outcome, messages) = run(&engine, options, LINK).await;

    assert_eq!(outcome, ProbeOutcome::Completed { reported: true });
    assert_eq!(
        count(&messages, |m| matches!(m, ProbeMessage::TrackerWarning { .. })),
        1
    );
    assert_eq!(engine.count(|call| *call == Call::Reannounce).await, 0);
    assert_eq!(engine.deletes().await, vec![true]);
}

#[tokio::test(start_paused = true)]
async fn cleanup_failure_does_not_change_outcome() {
    let mut engine = RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(downloading(1.0)),
    ]);
    engine.fail_delete = true;
    let engine = Arc::new(engine);

    let (outcome, messages) = run(&engine, options(), LINK).await;

    assert_eq!(outcome, ProbeOutcome::Completed { reported: true });
    assert!(matches!(
        messages.last(),
        Some(ProbeMessage::FinalReport { .. })
    ));
    assert_eq!(engine.deletes().await, vec![true]);
}

#[tokio::test(start_paused = true)]
async fn vanished_task_skips_report_but_cleans_up() {
    let engine = Arc::new(RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(downloading(1.0)),
        Reply::Missing,
    ]));

    let (outcome, messages) = run(&engine, options(), LINK).await;

    assert_eq!(outcome, ProbeOutcome::Completed { reported: false });
    assert_eq!(
        count(&messages, |m| matches!(m, ProbeMessage::FinalReport { .. })),
        0
    );
    assert_eq!(engine.deletes().await, vec![true]);
}

#[tokio::test(start_paused = true)]
async fn file_listing_failure_is_not_fatal() {
    let mut engine = RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(downloading(1.0)),
    ]);
    engine.fail_files = true;
    let engine = Arc::new(engine);

    let (outcome, messages) = run(&engine, options(), LINK).await;

    assert_eq!(outcome, ProbeOutcome::Completed { reported: true });
    assert_eq!(
        count(&messages, |m| matches!(m, ProbeMessage::Files { .. })),
        0
    );
    assert_eq!(engine.deletes().await, vec![true]);
}

#[tokio::test(start_paused = true)]
async fn verdict_boundary_follows_availability() {
    for (availability, verdict) in [
        (1.0, "verdict: healthy"),
        (0.99, "verdict: warning"),
    ] {
        let engine = Arc::new(RecordingEngine::with_replies([
            Reply::Missing,
            Reply::Snapshot(downloading(availability)),
        ]));
        let (_, messages) = run(&engine, options(), LINK).await;
        let report = messages
            .iter()
            .find(|m| matches!(m, ProbeMessage::FinalReport { .. }))
            .map(ToString::to_string)
            .unwrap_or_default();
        assert!(report.contains(verdict), "{availability}: {report}");
    }
}

#[tokio::test(start_paused = true)]
async fn cancelled_probe_leaves_task_registered() {
    let engine = Arc::new(RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(fetching_metadata()),
    ]));
    let client: Arc<dyn EngineClient> = Arc::clone(&engine) as Arc<dyn EngineClient>;
    let orchestrator = ProbeOrchestrator::new(client, options());
    let (sender, _receiver) = mpsc::unbounded_channel();

    let result =
        tokio::time::timeout(Duration::from_secs(10), orchestrator.probe(LINK, &sender)).await;

    assert!(result.is_err());
    assert_eq!(engine.count(|call| matches!(call, Call::Add(_))).await, 1);
    assert!(engine.deletes().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn final_report_counts_only_bytes_gained_during_the_window() {
    let mut finished = downloading(1.0);
    finished.downloaded = 3 * 1_048_576;
    let engine = Arc::new(RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(downloading(1.0)),
        Reply::Snapshot(finished),
    ]));

    let (_, messages) = run(&engine, options(), LINK).await;

    let report = messages
        .iter()
        .find(|m| matches!(m, ProbeMessage::FinalReport { .. }))
        .expect("final report");
    assert!(matches!(
        report,
        ProbeMessage::FinalReport {
            downloaded: 2_621_440,
            ..
        }
    ));
    assert!(
        report
            .to_string()
            .contains("downloaded during window: 2.50 MB")
    );
}

#[tokio::test(start_paused = true)]
async fn window_download_never_goes_negative() {
    let mut restarted = downloading(1.0);
    restarted.downloaded = 0;
    let engine = Arc::new(RecordingEngine::with_replies([
        Reply::Missing,
        Reply::Snapshot(downloading(1.0)),
        Reply::Snapshot(restarted),
    ]));

    let (_, messages) = run(&engine, options(), LINK).await;

    assert_eq!(
        count(&messages, |m| matches!(
            m,
            ProbeMessage::FinalReport { downloaded: 0, .. }
        )),
        1
    );
}
