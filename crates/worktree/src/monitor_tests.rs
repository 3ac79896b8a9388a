// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use super::*;
use crate::vcs::VcsStatus;

#[derive(Clone, Default)]
struct MockProbe {
    responses: Arc<Mutex<Vec<Result<VcsStatus, VcsError>>>>,
}

impl MockProbe {
    fn new(responses: Vec<Result<VcsStatus, VcsError>>) -> Self {
        Self { responses: Arc::new(Mutex::new(responses)) }
    }
}

impl VcsProbe for MockProbe {
    fn status(
        &self,
        _path: &Path,
    ) -> Pin<Box<dyn Future<Output = Result<VcsStatus, VcsError>> + Send + '_>> {
        let mut guard = self.responses.lock().expect("mock lock");
        let next = if guard.is_empty() { Ok(VcsStatus::default()) } else { guard.remove(0) };
        Box::pin(async move { next })
    }
}

fn delta(path: &str) -> FileDelta {
    FileDelta { path: path.into(), status: "M".into(), added: 1, removed: 0 }
}

#[tokio::test]
async fn circuit_breaker_trips_after_three_consecutive_errors() {
    let probe = MockProbe::new(vec![
        Err(VcsError::CommandFailed("boom".into())),
        Err(VcsError::CommandFailed("boom".into())),
        Err(VcsError::CommandFailed("boom".into())),
    ]);
    let mut monitor = Monitor::new(PathBuf::from("/tmp/wt"), probe, MonitorConfig::default());

    assert!(matches!(monitor.run_cycle(false).await, CycleResult::Retrying));
    assert!(!monitor.is_tripped());
    assert!(matches!(monitor.run_cycle(false).await, CycleResult::Retrying));
    assert!(!monitor.is_tripped());

    match monitor.run_cycle(false).await {
        CycleResult::BreakerTripped(snapshot) => assert_eq!(snapshot.mood, Mood::Error),
        other => panic!("expected BreakerTripped, got {other:?}"),
    }
    assert!(monitor.is_tripped());

    // Once tripped, further cycles are no-ops until a manual reset.
    assert!(matches!(monitor.run_cycle(false).await, CycleResult::Retrying));

    monitor.reset();
    assert!(!monitor.is_tripped());
}

#[tokio::test]
async fn index_lock_is_skipped_and_does_not_count_toward_breaker() {
    let probe = MockProbe::new(vec![
        Err(VcsError::IndexLocked),
        Err(VcsError::IndexLocked),
        Err(VcsError::IndexLocked),
        Err(VcsError::IndexLocked),
        Err(VcsError::IndexLocked),
    ]);
    let mut monitor = Monitor::new(PathBuf::from("/tmp/wt"), probe, MonitorConfig::default());
    for _ in 0..5 {
        assert!(matches!(monitor.run_cycle(false).await, CycleResult::Skipped));
    }
    assert!(!monitor.is_tripped());
}

#[tokio::test]
async fn missing_directory_reports_removed() {
    let probe = MockProbe::new(vec![Err(VcsError::DirectoryMissing)]);
    let mut monitor = Monitor::new(PathBuf::from("/tmp/wt"), probe, MonitorConfig::default());
    assert!(matches!(monitor.run_cycle(false).await, CycleResult::Removed));
}

#[tokio::test]
async fn unchanged_hash_short_circuits() {
    let status = VcsStatus { deltas: vec![delta("a.rs")], branch: Some("main".into()) };
    let probe = MockProbe::new(vec![Ok(status.clone()), Ok(status)]);
    let mut monitor = Monitor::new(PathBuf::from("/tmp/wt"), probe, MonitorConfig::default());

    assert!(matches!(monitor.run_cycle(false).await, CycleResult::Changed { .. }));
    assert!(matches!(monitor.run_cycle(false).await, CycleResult::Unchanged));
}

#[tokio::test]
async fn clean_to_dirty_triggers_immediate_then_debounced_then_cancel() {
    let probe = MockProbe::new(vec![
        Ok(VcsStatus { deltas: vec![delta("a.rs")], branch: None }),
        Ok(VcsStatus { deltas: vec![delta("a.rs"), delta("b.rs")], branch: None }),
        Ok(VcsStatus::default()),
    ]);
    let mut monitor = Monitor::new(PathBuf::from("/tmp/wt"), probe, MonitorConfig::default());

    match monitor.run_cycle(false).await {
        CycleResult::Changed { ai_trigger, snapshot } => {
            assert_eq!(ai_trigger, AiTrigger::Immediate);
            assert_eq!(snapshot.mood, Mood::Dirty);
        }
        other => panic!("expected Changed, got {other:?}"),
    }

    match monitor.run_cycle(false).await {
        CycleResult::Changed { ai_trigger, .. } => assert_eq!(ai_trigger, AiTrigger::Debounced),
        other => panic!("expected Changed, got {other:?}"),
    }

    match monitor.run_cycle(false).await {
        CycleResult::Changed { ai_trigger, snapshot } => {
            assert_eq!(ai_trigger, AiTrigger::Cancel);
            assert_eq!(snapshot.mood, Mood::Stable);
        }
        other => panic!("expected Changed, got {other:?}"),
    }
}

#[tokio::test]
async fn debouncer_coalesces_reschedule_into_newest_deadline() {
    let mut debouncer = SummaryDebouncer::new();
    let fired = Arc::new(Mutex::new(Vec::new()));

    let fired1 = Arc::clone(&fired);
    let fut1 = debouncer.schedule(Duration::from_millis(200), move || async move {
        fired1.lock().expect("lock").push(1);
    });
    assert!(debouncer.is_pending());
    tokio::spawn(fut1);

    tokio::time::sleep(Duration::from_millis(20)).await;

    let fired2 = Arc::clone(&fired);
    let fut2 = debouncer.schedule(Duration::from_millis(20), move || async move {
        fired2.lock().expect("lock").push(2);
    });
    tokio::spawn(fut2);

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(*fired.lock().expect("lock"), vec![2]);
}

#[tokio::test]
async fn debouncer_cancel_suppresses_fire() {
    let mut debouncer = SummaryDebouncer::new();
    let fired = Arc::new(Mutex::new(false));
    let fired_clone = Arc::clone(&fired);

    let fut = debouncer.schedule(Duration::from_millis(20), move || async move {
        *fired_clone.lock().expect("lock") = true;
    });
    tokio::spawn(fut);
    debouncer.cancel();
    assert!(!debouncer.is_pending());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!*fired.lock().expect("lock"));
}
