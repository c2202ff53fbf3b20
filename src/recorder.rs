//! Error recorder
//!
//! Builds an [`ErrorObservation`] from a prediction and the looked-up actual
//! value, then appends it to the record store on a background thread.
//!
//! # Delivery
//!
//! Appends are best-effort and at most once: one attempt, no retry, no
//! acknowledgment needed for the caller to carry on. A failed append is
//! logged and the observation is lost. The caller gets a [`PendingAppend`]
//! that reports the outcome if it cares; dropping it is fire-and-forget.
//!
//! ```text
//! caller thread                      append thread
//!   record() ── observation ──────►  store.append()
//!      │                                   │
//!      ▼                                   ▼
//!   returns immediately            AppendOutcome ──► PendingAppend
//! ```

use crate::observation::ErrorObservation;
use crate::selection::SubsetSelection;
use crate::store::RecordStore;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Result of one append attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Persisted,
    Failed(String),
}

impl AppendOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, AppendOutcome::Persisted)
    }
}

const WORKER_EXITED: &str = "append worker exited without reporting";

/// Completion signal for a background append
#[derive(Debug)]
pub struct PendingAppend {
    receiver: Receiver<AppendOutcome>,
    /// Set once an outcome has been handed out
    delivered: AtomicBool,
}

impl PendingAppend {
    fn new(receiver: Receiver<AppendOutcome>) -> Self {
        Self {
            receiver,
            delivered: AtomicBool::new(false),
        }
    }

    fn resolved(outcome: AppendOutcome) -> Self {
        let (sender, receiver) = channel::bounded(1);
        let _ = sender.send(outcome);
        Self::new(receiver)
    }

    fn deliver(&self, outcome: AppendOutcome) -> Option<AppendOutcome> {
        self.delivered.store(true, Ordering::Release);
        Some(outcome)
    }

    /// A closed channel means the worker died, unless its outcome was already taken
    fn disconnected(&self) -> Option<AppendOutcome> {
        if self.delivered.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(AppendOutcome::Failed(WORKER_EXITED.to_string()))
        }
    }

    /// Block until the append finishes
    pub fn wait(self) -> AppendOutcome {
        self.receiver
            .recv()
            .unwrap_or_else(|_| AppendOutcome::Failed(WORKER_EXITED.to_string()))
    }

    /// Block for at most `timeout`; `None` if the append is still running
    pub fn wait_timeout(&self, timeout: Duration) -> Option<AppendOutcome> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => self.deliver(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => self.disconnected(),
        }
    }

    /// Non-blocking poll; the outcome is delivered once
    pub fn try_outcome(&self) -> Option<AppendOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => self.deliver(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.disconnected(),
        }
    }
}

/// Observation plus the completion signal of its append
#[derive(Debug)]
pub struct Recorded {
    pub observation: ErrorObservation,
    pub pending: PendingAppend,
}

/// Creates observations and persists them through a [`RecordStore`]
#[derive(Clone)]
pub struct ErrorRecorder {
    store: Arc<dyn RecordStore>,
}

impl ErrorRecorder {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Record a completed round
    ///
    /// `predicted` and `actual` are percentages; `actual` must come from the
    /// out-of-sample side of the performance record.
    pub fn record(&self, predicted: f64, actual: f64, selection: &SubsetSelection) -> Recorded {
        let observation = ErrorObservation::now(predicted, actual, selection.clone());
        tracing::info!(
            "Recorded prediction error {:+.2} (predicted {:.2}, actual {:.2}, {})",
            observation.error_in_accuracy,
            observation.predicted_performance,
            observation.actual_performance,
            observation.selected_subsets
        );
        let pending = self.persist(observation.clone());
        Recorded {
            observation,
            pending,
        }
    }

    /// Append an already built observation in the background
    pub fn persist(&self, observation: ErrorObservation) -> PendingAppend {
        let (sender, receiver) = channel::bounded(1);
        let store = Arc::clone(&self.store);

        let spawned = thread::Builder::new()
            .name("subset-lab-append".to_string())
            .spawn(move || {
                let outcome = match store.append(&observation) {
                    Ok(()) => {
                        tracing::debug!("Observation persisted to {} store", store.name());
                        AppendOutcome::Persisted
                    }
                    Err(e) => {
                        tracing::warn!("Failed to persist observation to {} store: {}", store.name(), e);
                        AppendOutcome::Failed(e.to_string())
                    }
                };
                // Receiver may be gone (fire-and-forget)
                let _ = sender.send(outcome);
            });

        match spawned {
            Ok(_) => PendingAppend::new(receiver),
            Err(e) => {
                tracing::warn!("Failed to start append worker: {}", e);
                PendingAppend::resolved(AppendOutcome::Failed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ObservationQuery, Result as StoreResult, StoreError};

    struct FailingStore;

    impl RecordStore for FailingStore {
        fn append(&self, _observation: &ErrorObservation) -> StoreResult<()> {
            Err(StoreError::Transport("connection refused".to_string()))
        }

        fn query(&self, _query: &ObservationQuery) -> StoreResult<Vec<ErrorObservation>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct PanickingStore;

    impl RecordStore for PanickingStore {
        fn append(&self, _observation: &ErrorObservation) -> StoreResult<()> {
            panic!("backend crashed");
        }

        fn query(&self, _query: &ObservationQuery) -> StoreResult<Vec<ErrorObservation>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    fn selection() -> SubsetSelection {
        SubsetSelection::from_assignments(4, &[1, 2], &[3]).unwrap()
    }

    #[test]
    fn test_record_computes_error_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let recorder = ErrorRecorder::new(store.clone());

        let recorded = recorder.record(72.0, 65.43, &selection());
        assert_eq!(recorded.observation.error_in_accuracy, 6.57);
        assert_eq!(recorded.observation.actual_performance, 65.43);
        assert_eq!(recorded.observation.selected_subsets, selection());

        assert_eq!(recorded.pending.wait(), AppendOutcome::Persisted);
        let stored = store.query(&ObservationQuery::default()).unwrap();
        assert_eq!(stored, vec![recorded.observation]);
    }

    #[test]
    fn test_failed_append_is_reported_not_raised() {
        let recorder = ErrorRecorder::new(Arc::new(FailingStore));
        let recorded = recorder.record(50.0, 80.0, &selection());

        // The observation is still returned to the caller
        assert_eq!(recorded.observation.error_in_accuracy, -30.0);
        match recorded.pending.wait() {
            AppendOutcome::Failed(msg) => assert!(msg.contains("connection refused")),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_dropping_pending_append_is_fire_and_forget() {
        let store = Arc::new(MemoryStore::new());
        let recorder = ErrorRecorder::new(store.clone());
        drop(recorder.record(60.0, 50.0, &selection()).pending);

        // Wait for the detached worker through a second append's signal
        let pending = recorder.persist(ErrorObservation::new(
            61.0,
            50.0,
            selection(),
            "2025-03-01T10:00:00.000Z",
        ));
        assert!(pending.wait().is_persisted());
        for _ in 0..100 {
            if store.len() == 2 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_wait_timeout_and_try_outcome() {
        let recorder = ErrorRecorder::new(Arc::new(MemoryStore::new()));
        let pending = recorder.persist(ErrorObservation::new(
            60.0,
            50.0,
            selection(),
            "2025-03-01T10:00:00.000Z",
        ));

        let outcome = pending.wait_timeout(Duration::from_secs(5));
        assert_eq!(outcome, Some(AppendOutcome::Persisted));
        // Delivered once
        assert_eq!(pending.try_outcome(), None);
    }

    #[test]
    fn test_try_outcome_reports_dead_worker() {
        let recorder = ErrorRecorder::new(Arc::new(PanickingStore));
        let pending = recorder.persist(ErrorObservation::new(
            60.0,
            50.0,
            selection(),
            "2025-03-01T10:00:00.000Z",
        ));

        let mut outcome = None;
        for _ in 0..500 {
            outcome = pending.try_outcome();
            if outcome.is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(outcome, Some(AppendOutcome::Failed(WORKER_EXITED.to_string())));
        // Reported once
        assert_eq!(pending.try_outcome(), None);
    }

    #[test]
    fn test_wait_timeout_reports_dead_worker() {
        let recorder = ErrorRecorder::new(Arc::new(PanickingStore));
        let pending = recorder.persist(ErrorObservation::new(
            60.0,
            50.0,
            selection(),
            "2025-03-01T10:00:00.000Z",
        ));

        assert_eq!(
            pending.wait_timeout(Duration::from_secs(5)),
            Some(AppendOutcome::Failed(WORKER_EXITED.to_string()))
        );
    }

    #[test]
    fn test_resolved_pending_append() {
        let pending = PendingAppend::resolved(AppendOutcome::Failed("boom".to_string()));
        assert_eq!(pending.try_outcome(), Some(AppendOutcome::Failed("boom".to_string())));
    }
}
