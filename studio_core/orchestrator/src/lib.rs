pub mod clock;
pub mod error;
pub mod notify;
pub mod reconciler;
pub mod upload;
pub mod wizard;

pub use clock::{Clock, InstantClock, TokioClock};
pub use error::OrchestratorError;
pub use notify::{Notification, NotificationSink, Severity};
pub use reconciler::{
    DeleteOutcome, DialogSession, KindState, SaveOutcome, SelectOutcome, SourceOrchestrator,
    TestOutcome, ToggleOutcome, UpdateOutcome, UploadOutcome,
};
pub use upload::UploadBatch;
pub use wizard::{StepController, STEPS};

use catalog::ConnectionStore;
use common::config::LatencyConfig;
use parking_lot::Mutex;
use shared_clients::RegistryApi;
use std::sync::Arc;

/// Product-creation flow facade: the reconciler plus the step controller,
/// with the gate between them wired up.
pub struct StudioFlow {
    orchestrator: SourceOrchestrator,
    steps: Mutex<StepController>,
}

impl StudioFlow {
    pub fn new(
        registry: Arc<dyn RegistryApi>,
        clock: Arc<dyn Clock>,
        latency: LatencyConfig,
    ) -> Self {
        let sink = NotificationSink::new();
        let store = ConnectionStore::new();
        Self {
            orchestrator: SourceOrchestrator::new(registry, store, sink, clock, latency),
            steps: Mutex::new(StepController::new()),
        }
    }

    pub fn orchestrator(&self) -> &SourceOrchestrator {
        &self.orchestrator
    }

    pub fn active_step(&self) -> usize {
        self.steps.lock().active()
    }

    pub fn step_label(&self) -> &'static str {
        self.steps.lock().label()
    }

    /// Recomputed on every query, never cached. Steps past the first are
    /// not gated here.
    pub fn readiness(&self) -> bool {
        if self.steps.lock().is_first() {
            self.orchestrator.readiness()
        } else {
            true
        }
    }

    pub fn try_next(&self) -> bool {
        let ready = self.readiness();
        self.steps.lock().try_next(ready)
    }

    pub fn back(&self) -> bool {
        self.steps.lock().back()
    }

    /// Back to step 0 with a clean draft. Persisted connections and their
    /// claims are untouched.
    pub fn reset(&self) {
        self.orchestrator.reset();
        self.steps.lock().reset();
    }
}
