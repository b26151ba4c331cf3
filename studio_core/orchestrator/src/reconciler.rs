use crate::clock::Clock;
use crate::error::OrchestratorError;
use crate::notify::NotificationSink;
use crate::upload::UploadBatch;
use catalog::{lookup, CatalogError, ConnectionStore, UPLOAD_KIND};
use common::config::LatencyConfig;
use common::types::{
    AgentArtifact, ConnectionForm, ConnectionId, ConnectionPatch, ConnectionRecord, FileEntry,
    HealthProbe, Locality, NewConnection, UploadReceipt,
};
use parking_lot::Mutex;
use shared_clients::{ClientError, RegistryApi};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of one connector kind within the active draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindState {
    #[default]
    Unselected,
    Configuring,
    Testing,
    ConnectedNew,
}

/// One open credential dialog. At most one exists at a time; its epoch
/// ties async completions back to the session that issued them.
#[derive(Debug, Clone)]
pub struct DialogSession {
    pub kind: String,
    pub locality: Locality,
    pub form: ConnectionForm,
    pub test_passed: bool,
    pub testing: bool,
    pub saving: bool,
    epoch: u64,
}

impl DialogSession {
    fn open(kind: String, epoch: u64) -> Self {
        Self {
            kind,
            locality: Locality::default(),
            form: ConnectionForm::default(),
            test_passed: false,
            testing: false,
            saving: false,
            epoch,
        }
    }
}

/// Where a catalog selection routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Fresh selection: credential dialog opened on a cleared form.
    DialogOpened,
    /// Already connected this session: edit-or-disconnect decision.
    EditDecisionOpened,
    /// Was selected but not connected: toggled off, no server call.
    Deselected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(ConnectionRecord),
    /// No successful test in this dialog session; nothing sent.
    RejectedUntested,
    /// Natural-key duplicate in the mirror; nothing sent.
    RejectedDuplicate,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Claimed,
    Released,
    /// Release requested on an available connection.
    NoOp,
    /// A handshake for this connection is already in flight.
    Busy,
    /// Saved this session; must go through the disconnect path.
    Guarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(ConnectionRecord),
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Uploaded(UploadReceipt),
    /// Empty batch; nothing sent.
    Empty,
    Failed,
}

#[derive(Default)]
struct Inner {
    draft: Vec<String>,
    kind_states: HashMap<String, KindState>,
    status_new: HashMap<String, bool>,
    dialog: Option<DialogSession>,
    dialog_epoch: u64,
    /// Kind -> connection saved for it in this session. Backs the
    /// invariant that a `ConnectedNew` kind claims exactly one connection.
    session_saved: HashMap<String, ConnectionId>,
    pending_edit: Option<String>,
    pending_delete: Option<ConnectionId>,
    batch: UploadBatch,
}

/// The connection-state reconciler: routes catalog selections, owns the
/// credential dialog, coordinates test/save/claim flows against the
/// registry, and answers the wizard's readiness question.
pub struct SourceOrchestrator {
    registry: Arc<dyn RegistryApi>,
    store: ConnectionStore,
    sink: NotificationSink,
    clock: Arc<dyn Clock>,
    latency: LatencyConfig,
    inner: Mutex<Inner>,
}

impl SourceOrchestrator {
    pub fn new(
        registry: Arc<dyn RegistryApi>,
        store: ConnectionStore,
        sink: NotificationSink,
        clock: Arc<dyn Clock>,
        latency: LatencyConfig,
    ) -> Self {
        Self {
            registry,
            store,
            sink,
            clock,
            latency,
            inner: Mutex::new(Inner::default()),
        }
    }

    /* ---------- snapshots for the rendering layer ---------- */

    pub fn draft_selection(&self) -> Vec<String> {
        self.inner.lock().draft.clone()
    }

    pub fn kind_state(&self, kind: &str) -> KindState {
        self.inner
            .lock()
            .kind_states
            .get(kind)
            .copied()
            .unwrap_or_default()
    }

    /// "A freshly-tested connection succeeded for this kind this session."
    pub fn status_new(&self, kind: &str) -> bool {
        self.inner
            .lock()
            .status_new
            .get(kind)
            .copied()
            .unwrap_or(false)
    }

    pub fn dialog(&self) -> Option<DialogSession> {
        self.inner.lock().dialog.clone()
    }

    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    pub fn sink(&self) -> &NotificationSink {
        &self.sink
    }

    /* ---------- catalog selection ---------- */

    /// Route a click on a catalog card. See `SelectOutcome`.
    pub fn select_source(&self, kind: &str) -> Result<SelectOutcome, OrchestratorError> {
        if lookup(kind).is_none() {
            return Err(OrchestratorError::state(format!(
                "unknown connector kind '{kind}'"
            )));
        }

        let mut g = self.inner.lock();
        let connected = g.status_new.get(kind).copied().unwrap_or(false)
            || g.kind_states.get(kind) == Some(&KindState::ConnectedNew);

        if connected {
            g.pending_edit = Some(kind.to_owned());
            return Ok(SelectOutcome::EditDecisionOpened);
        }

        if g.draft.iter().any(|k| k == kind) {
            g.draft.retain(|k| k != kind);
            g.kind_states.insert(kind.to_owned(), KindState::Unselected);
            return Ok(SelectOutcome::Deselected);
        }

        g.draft.push(kind.to_owned());
        g.kind_states.insert(kind.to_owned(), KindState::Configuring);
        g.status_new.insert(kind.to_owned(), false);
        g.dialog_epoch += 1;
        g.dialog = Some(DialogSession::open(kind.to_owned(), g.dialog_epoch));
        Ok(SelectOutcome::DialogOpened)
    }

    pub fn set_form(&self, form: ConnectionForm) -> Result<(), OrchestratorError> {
        let mut g = self.inner.lock();
        let dialog = g
            .dialog
            .as_mut()
            .ok_or_else(|| OrchestratorError::state("no credential dialog is open"))?;
        dialog.form = form;
        Ok(())
    }

    pub fn set_locality(&self, locality: Locality) -> Result<(), OrchestratorError> {
        let mut g = self.inner.lock();
        let dialog = g
            .dialog
            .as_mut()
            .ok_or_else(|| OrchestratorError::state("no credential dialog is open"))?;
        dialog.locality = locality;
        Ok(())
    }

    /// Closing does not cancel an in-flight test or save; a late response
    /// still lands in the status maps but will not reopen the dialog.
    pub fn close_dialog(&self) {
        self.inner.lock().dialog = None;
    }

    /* ---------- test / save ---------- */

    pub async fn test_connection(&self) -> Result<TestOutcome, OrchestratorError> {
        let (kind, locality, probe, epoch) = {
            let mut g = self.inner.lock();
            let dialog = g
                .dialog
                .as_mut()
                .ok_or_else(|| OrchestratorError::state("no credential dialog is open"))?;
            if dialog.testing {
                return Err(OrchestratorError::busy("a connection test is running"));
            }
            dialog.testing = true;
            dialog.test_passed = false;
            let kind = dialog.kind.clone();
            let probe = HealthProbe {
                url: dialog.form.url.clone(),
                token: dialog.form.token.clone(),
            };
            let (locality, epoch) = (dialog.locality, dialog.epoch);
            g.kind_states.insert(kind.clone(), KindState::Testing);
            (kind, locality, probe, epoch)
        };

        // Cloud kinds are validated server-side at save time; the client
        // round-trip is simulated. Local kinds need the real probe.
        let result: Result<(), ClientError> = match locality {
            Locality::Cloud => {
                self.clock
                    .sleep(Duration::from_millis(self.latency.cloud_test_ms))
                    .await;
                Ok(())
            }
            Locality::Local => self.registry.health_check(&probe).await,
        };

        let passed = result.is_ok();
        {
            let mut g = self.inner.lock();
            g.status_new.insert(kind.clone(), passed);
            if g.kind_states.get(&kind) == Some(&KindState::Testing) {
                g.kind_states.insert(kind.clone(), KindState::Configuring);
            }
            if let Some(dialog) = g.dialog.as_mut().filter(|d| d.epoch == epoch) {
                dialog.testing = false;
                dialog.test_passed = passed;
            }
        }

        match result {
            Ok(()) => {
                self.sink.success(match locality {
                    Locality::Cloud => "Cloud connection successful!",
                    Locality::Local => "Local connection successful!",
                });
                Ok(TestOutcome::Passed)
            }
            Err(err) => {
                log::warn!("connection test failed for '{kind}': {err}");
                self.sink.error("Connection failed");
                Ok(TestOutcome::Failed)
            }
        }
    }

    pub async fn save_connection(&self) -> Result<SaveOutcome, OrchestratorError> {
        let (kind, payload, epoch) = {
            let mut g = self.inner.lock();
            let dialog = g
                .dialog
                .as_mut()
                .ok_or_else(|| OrchestratorError::state("no credential dialog is open"))?;
            if dialog.saving {
                return Err(OrchestratorError::busy("a save is already running"));
            }
            if !dialog.test_passed {
                drop(g);
                self.sink.warning("Please test the connection before saving");
                return Ok(SaveOutcome::RejectedUntested);
            }

            let form = &dialog.form;
            let kind = dialog.kind.clone();
            if self
                .store
                .find_duplicate(&kind, &form.host, &form.port, &form.username, &form.database)
                .is_some()
            {
                drop(g);
                self.sink.warning("Connection already exists");
                return Ok(SaveOutcome::RejectedDuplicate);
            }

            let name = if form.name.is_empty() {
                kind.clone()
            } else {
                form.name.clone()
            };
            let payload = NewConnection {
                kind: kind.clone(),
                name,
                host: form.host.clone(),
                port: form.port.clone(),
                username: form.username.clone(),
                password: form.password.clone(),
                database: form.database.clone(),
            };
            let epoch = dialog.epoch;
            dialog.saving = true;
            (kind, payload, epoch)
        };

        let result = self.registry.create_connection(&payload).await;

        let mut g = self.inner.lock();
        if let Some(dialog) = g.dialog.as_mut().filter(|d| d.epoch == epoch) {
            dialog.saving = false;
        }
        match result {
            Ok(record) => {
                let id = record.connector_id.clone();
                // Mirror insert marks the record InUse + recently-added in
                // one write, so no reader sees it available in between.
                if let Err(err) = self.store.insert_saved(record.clone()) {
                    log::warn!("mirror already held '{id}' after save: {err}");
                }
                g.kind_states.insert(kind.clone(), KindState::ConnectedNew);
                g.status_new.insert(kind.clone(), true);
                g.session_saved.insert(kind.clone(), id);
                if g.dialog.as_ref().is_some_and(|d| d.epoch == epoch) {
                    g.dialog = None;
                }
                drop(g);
                self.sink.success("Connection saved successfully!");
                Ok(SaveOutcome::Saved(record))
            }
            Err(err) => {
                drop(g);
                log::warn!("failed to save connection for '{kind}': {err}");
                self.sink.error("Failed to save connection");
                Ok(SaveOutcome::Failed)
            }
        }
    }

    /* ---------- edit-or-disconnect decision ---------- */

    pub fn pending_edit(&self) -> Option<String> {
        self.inner.lock().pending_edit.clone()
    }

    /// Reopen the credential dialog for an already-connected kind. The
    /// form comes back cleared; secrets are never pre-filled.
    pub fn edit_source(&self, kind: &str) -> Result<(), OrchestratorError> {
        if lookup(kind).is_none() {
            return Err(OrchestratorError::state(format!(
                "unknown connector kind '{kind}'"
            )));
        }
        let mut g = self.inner.lock();
        if g.pending_edit.as_deref() == Some(kind) {
            g.pending_edit = None;
        }
        g.status_new.insert(kind.to_owned(), false);
        g.kind_states.insert(kind.to_owned(), KindState::Configuring);
        if !g.draft.iter().any(|k| k == kind) {
            g.draft.push(kind.to_owned());
        }
        g.dialog_epoch += 1;
        g.dialog = Some(DialogSession::open(kind.to_owned(), g.dialog_epoch));
        Ok(())
    }

    /// Drop the kind from the draft entirely: selection, new-status flag,
    /// and (when a connection was saved for it this session) its claim.
    pub fn disconnect_source(&self, kind: &str) -> Result<(), OrchestratorError> {
        let saved = {
            let mut g = self.inner.lock();
            if g.pending_edit.as_deref() == Some(kind) {
                g.pending_edit = None;
            }
            g.draft.retain(|k| k != kind);
            g.status_new.insert(kind.to_owned(), false);
            g.kind_states.insert(kind.to_owned(), KindState::Unselected);
            g.session_saved.remove(kind)
        };

        if let Some(id) = saved {
            if let Err(err) = self.store.force_release(&id) {
                // Deleted out from under us; the claim is already moot.
                log::warn!("could not release '{id}' on disconnect: {err}");
            }
        }
        Ok(())
    }

    /* ---------- existing-connections view ---------- */

    pub async fn toggle_connection(
        &self,
        id: &ConnectionId,
    ) -> Result<ToggleOutcome, OrchestratorError> {
        let entry = self.store.get(id).ok_or_else(|| {
            self.sink.error("Connection not found");
            OrchestratorError::state(format!("connection '{id}' is not in the mirror"))
        })?;

        if entry.status.busy() {
            return Ok(ToggleOutcome::Busy);
        }
        if entry.status.in_use() {
            self.release_connection(id).await
        } else {
            self.claim_connection(id).await
        }
    }

    /// Advisory claim with a simulated handshake. The toggle for this id
    /// is disabled (`Busy`) until the handshake lands.
    pub async fn claim_connection(
        &self,
        id: &ConnectionId,
    ) -> Result<ToggleOutcome, OrchestratorError> {
        let entry = self.store.get(id).ok_or_else(|| {
            self.sink.error("Connection not found");
            OrchestratorError::state(format!("connection '{id}' is not in the mirror"))
        })?;
        let name = entry.record.name.clone();

        match self.store.begin_claim(id) {
            Ok(()) => {}
            Err(CatalogError::Busy { .. }) => return Ok(ToggleOutcome::Busy),
            Err(CatalogError::InvalidTransition { .. }) => return Ok(ToggleOutcome::NoOp),
            Err(err) => return Err(OrchestratorError::state(err.to_string())),
        }

        self.sink.info(format!("Connecting to {name}..."));
        self.clock
            .sleep(Duration::from_millis(self.latency.claim_ms))
            .await;
        self.store
            .finish_claim(id)
            .map_err(|err| OrchestratorError::state(err.to_string()))?;
        self.sink.success(format!("{name} is now in use!"));
        Ok(ToggleOutcome::Claimed)
    }

    /// Release is a no-op on an available connection, and refused for one
    /// saved in this session (disconnect path only).
    pub async fn release_connection(
        &self,
        id: &ConnectionId,
    ) -> Result<ToggleOutcome, OrchestratorError> {
        let entry = self.store.get(id).ok_or_else(|| {
            self.sink.error("Connection not found");
            OrchestratorError::state(format!("connection '{id}' is not in the mirror"))
        })?;
        let name = entry.record.name.clone();

        match self.store.begin_release(id) {
            Ok(()) => {}
            Err(CatalogError::Busy { .. }) => return Ok(ToggleOutcome::Busy),
            Err(CatalogError::InvalidTransition { .. }) => return Ok(ToggleOutcome::NoOp),
            Err(CatalogError::Protected { .. }) => {
                self.sink.warning(format!(
                    "{name} was added in this session; disconnect it from the connector view"
                ));
                return Ok(ToggleOutcome::Guarded);
            }
            Err(err) => return Err(OrchestratorError::state(err.to_string())),
        }

        self.sink.info(format!("Disconnecting {name}..."));
        self.clock
            .sleep(Duration::from_millis(self.latency.release_ms))
            .await;
        self.store
            .finish_release(id)
            .map_err(|err| OrchestratorError::state(err.to_string()))?;
        self.sink.info(format!("{name} disconnected"));
        Ok(ToggleOutcome::Released)
    }

    pub async fn refresh_connections(&self) -> Result<usize, OrchestratorError> {
        match self.registry.list_connections().await {
            Ok(records) => {
                let count = records.len();
                self.store.replace_all(records);
                Ok(count)
            }
            Err(err) => {
                self.sink.error("Failed to load saved connections");
                Err(OrchestratorError::client(err))
            }
        }
    }

    pub async fn update_existing(
        &self,
        id: &ConnectionId,
        patch: &ConnectionPatch,
    ) -> Result<UpdateOutcome, OrchestratorError> {
        if self.store.get(id).is_none() {
            log::error!("update requested for unknown connection '{id}'");
            self.sink.error("Update failed: no connection selected");
            return Err(OrchestratorError::state(format!(
                "connection '{id}' is not in the mirror"
            )));
        }

        match self.registry.update_connection(id, patch).await {
            Ok(record) => {
                if let Err(err) = self.store.apply_update(record.clone()) {
                    log::warn!("mirror lost '{id}' during update: {err}");
                }
                self.sink.success("Connection updated successfully");
                Ok(UpdateOutcome::Updated(record))
            }
            Err(err) => {
                log::warn!("failed to update connection '{id}': {err}");
                self.sink.error("Error updating connection");
                Ok(UpdateOutcome::Failed)
            }
        }
    }

    /* ---------- delete (two-step: confirm first) ---------- */

    pub fn request_delete(&self, id: &ConnectionId) -> Result<(), OrchestratorError> {
        if self.store.get(id).is_none() {
            self.sink.error("Delete failed: no connection selected");
            return Err(OrchestratorError::state(format!(
                "connection '{id}' is not in the mirror"
            )));
        }
        self.inner.lock().pending_delete = Some(id.clone());
        Ok(())
    }

    pub fn cancel_delete(&self) {
        self.inner.lock().pending_delete = None;
    }

    pub async fn confirm_delete(&self) -> Result<DeleteOutcome, OrchestratorError> {
        let pending = self.inner.lock().pending_delete.take();
        let Some(id) = pending else {
            log::error!("delete confirmed with nothing selected");
            self.sink.error("Delete failed: no connection selected");
            return Err(OrchestratorError::state("no delete is pending"));
        };

        match self.registry.delete_connection(&id).await {
            Ok(()) => {
                if let Err(err) = self.store.remove(&id) {
                    log::warn!("mirror lost '{id}' before delete: {err}");
                }
                self.demote_kind_for(&id);
                self.sink.success("Connection deleted successfully");
                Ok(DeleteOutcome::Deleted)
            }
            Err(err) => {
                log::warn!("failed to delete connection '{id}': {err}");
                self.sink.error("Error deleting connection");
                Ok(DeleteOutcome::Failed)
            }
        }
    }

    /// Deleting the connection a kind was promoted on demotes the kind,
    /// keeping "ConnectedNew implies exactly one claimed connection" true.
    fn demote_kind_for(&self, id: &ConnectionId) {
        let mut g = self.inner.lock();
        let kind = g
            .session_saved
            .iter()
            .find_map(|(kind, saved)| (saved == id).then(|| kind.clone()));
        if let Some(kind) = kind {
            g.session_saved.remove(&kind);
            g.status_new.insert(kind.clone(), false);
            let next = if g.draft.iter().any(|k| k == &kind) {
                KindState::Configuring
            } else {
                KindState::Unselected
            };
            g.kind_states.insert(kind, next);
        }
    }

    /* ---------- agent download ---------- */

    pub async fn download_agent(&self) -> Result<AgentArtifact, OrchestratorError> {
        match self.registry.download_agent().await {
            Ok(artifact) => {
                self.sink.success("Connector downloaded");
                Ok(artifact)
            }
            Err(err) => {
                let message = match &err {
                    ClientError::NoResponse { .. } => "No response from server".to_owned(),
                    ClientError::ServerRejection { status, .. } => {
                        format!("Download failed: {status}")
                    }
                    _ => "Download failed".to_owned(),
                };
                self.sink.error(message);
                Err(OrchestratorError::client(err))
            }
        }
    }

    /* ---------- upload batch ---------- */

    /// Picker and drag-drop both land here. Any add ensures the synthetic
    /// upload kind is in the draft exactly once.
    pub fn add_files(&self, files: Vec<FileEntry>) {
        if files.is_empty() {
            return;
        }
        let mut g = self.inner.lock();
        for file in files {
            g.batch.add(file);
        }
        if !g.draft.iter().any(|k| k == UPLOAD_KIND) {
            g.draft.push(UPLOAD_KIND.to_owned());
        }
    }

    pub fn remove_file(&self, name: &str) -> bool {
        self.inner.lock().batch.remove(name)
    }

    pub fn batch_files(&self) -> Vec<FileEntry> {
        self.inner.lock().batch.files()
    }

    pub async fn submit_batch(&self) -> Result<UploadOutcome, OrchestratorError> {
        let files = self.inner.lock().batch.files();
        if files.is_empty() {
            self.sink.warning("No files selected");
            return Ok(UploadOutcome::Empty);
        }

        match self.registry.upload_batch(&files).await {
            Ok(receipt) => {
                // The batch stays: the product is still being assembled.
                self.sink.success("Upload completed successfully!");
                Ok(UploadOutcome::Uploaded(receipt))
            }
            Err(err) => {
                log::warn!("batch upload failed: {err}");
                self.sink.error("Upload Failed!");
                Ok(UploadOutcome::Failed)
            }
        }
    }

    /* ---------- readiness & reset ---------- */

    /// Step-0 gate: a non-empty batch, or a non-empty selection whose
    /// every kind has a fresh successful test.
    pub fn readiness(&self) -> bool {
        let g = self.inner.lock();
        let any_upload = !g.batch.is_empty();
        let any_selected = !g.draft.is_empty();
        let all_connected = any_selected
            && g.draft
                .iter()
                .all(|kind| g.status_new.get(kind).copied().unwrap_or(false));
        any_upload || all_connected
    }

    /// Clears draft-scoped state only; the mirror and its claims are
    /// durable, server-backed state and survive.
    pub fn reset(&self) {
        let mut g = self.inner.lock();
        g.draft.clear();
        g.kind_states.clear();
        g.status_new.clear();
        g.dialog = None;
        g.session_saved.clear();
        g.pending_edit = None;
        g.pending_delete = None;
        g.batch.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{InstantClock, TokioClock};
    use catalog::ClaimStatus;
    use common::types::FileEntry;
    use matches::assert_matches;
    use test_utils::{connection_record, server_error, timeout_error, MockRegistry};

    fn harness() -> (Arc<MockRegistry>, SourceOrchestrator) {
        let registry = Arc::new(MockRegistry::new());
        let orchestrator = SourceOrchestrator::new(
            registry.clone(),
            ConnectionStore::new(),
            NotificationSink::new(),
            Arc::new(InstantClock::new()),
            LatencyConfig::default(),
        );
        (registry, orchestrator)
    }

    fn filled_form() -> ConnectionForm {
        ConnectionForm {
            host: "db.example".into(),
            port: "3306".into(),
            username: "svc".into(),
            password: "secret".into(),
            database: "sales".into(),
            ..Default::default()
        }
    }

    #[test]
    fn selecting_a_fresh_kind_opens_a_cleared_dialog() {
        let (_, orch) = harness();
        let outcome = orch.select_source("postgres").expect("select");
        assert_eq!(outcome, SelectOutcome::DialogOpened);
        assert_eq!(orch.draft_selection(), vec!["postgres"]);
        assert_eq!(orch.kind_state("postgres"), KindState::Configuring);

        let dialog = orch.dialog().expect("dialog open");
        assert_eq!(dialog.kind, "postgres");
        assert_eq!(dialog.form, ConnectionForm::default());
        assert!(!dialog.test_passed);
    }

    #[test]
    fn selecting_again_before_connecting_toggles_off() {
        let (_, orch) = harness();
        orch.select_source("postgres").expect("select");
        let outcome = orch.select_source("postgres").expect("reselect");
        assert_eq!(outcome, SelectOutcome::Deselected);
        assert!(orch.draft_selection().is_empty());
        assert_eq!(orch.kind_state("postgres"), KindState::Unselected);
    }

    #[test]
    fn selecting_an_unknown_kind_is_a_state_error() {
        let (_, orch) = harness();
        let err = orch.select_source("sqlite").expect_err("unknown kind");
        assert_matches!(err, OrchestratorError::State { .. });
    }

    #[tokio::test]
    async fn cloud_test_is_a_simulated_round_trip() {
        let registry = Arc::new(MockRegistry::new());
        let clock = Arc::new(InstantClock::new());
        let orch = SourceOrchestrator::new(
            registry.clone(),
            ConnectionStore::new(),
            NotificationSink::new(),
            clock.clone(),
            LatencyConfig::default(),
        );

        orch.select_source("mysql").expect("select");
        let outcome = orch.test_connection().await.expect("test");
        assert_eq!(outcome, TestOutcome::Passed);
        assert!(orch.status_new("mysql"));
        assert!(orch.readiness());
        // Simulated delay went through the injected clock, no real call.
        assert_eq!(clock.slept(), vec![Duration::from_millis(1500)]);
        assert!(registry.calls().is_empty());
        assert_eq!(
            orch.sink().latest().expect("notified").message,
            "Cloud connection successful!"
        );
    }

    #[tokio::test]
    async fn rejected_local_probe_keeps_next_disabled() {
        let (registry, orch) = harness();
        registry.push_health(Err(server_error(500)));

        orch.select_source("postgres").expect("select");
        orch.set_locality(Locality::Local).expect("locality");
        orch.set_form(ConnectionForm {
            url: "http://agent.local:9090".into(),
            token: "tok".into(),
            ..Default::default()
        })
        .expect("form");

        let outcome = orch.test_connection().await.expect("test");
        assert_eq!(outcome, TestOutcome::Failed);
        assert!(!orch.status_new("postgres"));
        assert!(!orch.readiness());
        let latest = orch.sink().latest().expect("notified");
        assert_eq!(latest.severity, crate::notify::Severity::Error);
        assert_eq!(latest.message, "Connection failed");
        assert_eq!(registry.calls(), vec!["health_check:http://agent.local:9090"]);
    }

    #[tokio::test]
    async fn save_without_a_successful_test_is_blocked_locally() {
        let (registry, orch) = harness();
        orch.select_source("mysql").expect("select");
        orch.set_form(filled_form()).expect("form");

        let outcome = orch.save_connection().await.expect("save");
        assert_eq!(outcome, SaveOutcome::RejectedUntested);
        assert!(registry.calls().is_empty());
        let latest = orch.sink().latest().expect("notified");
        assert_eq!(latest.severity, crate::notify::Severity::Warning);
        assert_eq!(latest.message, "Please test the connection before saving");
    }

    #[tokio::test]
    async fn save_rejects_a_natural_key_duplicate() {
        let (registry, orch) = harness();
        orch.store()
            .replace_all(vec![connection_record("c-9", "mysql")]);

        orch.select_source("mysql").expect("select");
        orch.test_connection().await.expect("test");
        // Same (kind, host, port, username, database) as the mirror entry.
        orch.set_form(ConnectionForm {
            host: "db.internal".into(),
            port: "5432".into(),
            username: "svc".into(),
            password: "secret".into(),
            database: "analytics".into(),
            ..Default::default()
        })
        .expect("form");

        let outcome = orch.save_connection().await.expect("save");
        assert_eq!(outcome, SaveOutcome::RejectedDuplicate);
        assert!(!registry.calls().iter().any(|c| c.starts_with("create")));
    }

    #[tokio::test]
    async fn save_promotes_the_kind_and_claims_in_the_same_write() {
        let (_, orch) = harness();
        orch.select_source("mysql").expect("select");
        orch.test_connection().await.expect("test");
        orch.set_form(filled_form()).expect("form");

        let outcome = orch.save_connection().await.expect("save");
        let record = match outcome {
            SaveOutcome::Saved(record) => record,
            other => panic!("expected Saved, got {other:?}"),
        };

        assert_eq!(orch.kind_state("mysql"), KindState::ConnectedNew);
        assert!(orch.dialog().is_none());

        let entry = orch.store().get(&record.connector_id).expect("mirrored");
        assert_eq!(entry.status, ClaimStatus::InUse);
        assert!(entry.recently_added);

        // ConnectedNew implies exactly one claimed connection for the kind.
        let claimed: Vec<_> = orch
            .store()
            .list()
            .into_iter()
            .filter(|e| e.record.kind == "mysql" && e.status.in_use())
            .collect();
        assert_eq!(claimed.len(), 1);

        // The fresh claim cannot be dropped through the toggle.
        let toggled = orch
            .toggle_connection(&record.connector_id)
            .await
            .expect("toggle");
        assert_eq!(toggled, ToggleOutcome::Guarded);
        assert!(orch
            .store()
            .get(&record.connector_id)
            .expect("entry")
            .status
            .in_use());
    }

    #[tokio::test]
    async fn save_failure_stays_retryable() {
        let (registry, orch) = harness();
        registry.push_create(Err(server_error(502)));

        orch.select_source("mysql").expect("select");
        orch.test_connection().await.expect("test");
        orch.set_form(filled_form()).expect("form");

        let outcome = orch.save_connection().await.expect("save");
        assert_eq!(outcome, SaveOutcome::Failed);
        // Dialog and test flag survive for the retry.
        let dialog = orch.dialog().expect("dialog still open");
        assert!(dialog.test_passed);
        assert!(!dialog.saving);

        let retried = orch.save_connection().await.expect("retry");
        assert_matches!(retried, SaveOutcome::Saved(_));
    }

    #[tokio::test(start_paused = true)]
    async fn late_test_response_updates_maps_but_not_the_dialog() {
        let registry = Arc::new(MockRegistry::new());
        let orch = Arc::new(SourceOrchestrator::new(
            registry,
            ConnectionStore::new(),
            NotificationSink::new(),
            Arc::new(TokioClock),
            LatencyConfig::default(),
        ));

        orch.select_source("mysql").expect("select");
        let worker = orch.clone();
        let in_flight = tokio::spawn(async move { worker.test_connection().await });
        tokio::task::yield_now().await;

        // User closes the dialog while the test is still in flight.
        orch.close_dialog();

        let outcome = in_flight.await.expect("join").expect("test");
        assert_eq!(outcome, TestOutcome::Passed);
        assert!(orch.status_new("mysql"));
        assert!(orch.dialog().is_none());
    }

    #[tokio::test]
    async fn edit_decision_routes_instead_of_reopening_the_form() {
        let (_, orch) = harness();
        orch.select_source("mysql").expect("select");
        orch.test_connection().await.expect("test");
        orch.set_form(filled_form()).expect("form");
        orch.save_connection().await.expect("save");

        let outcome = orch.select_source("mysql").expect("reselect");
        assert_eq!(outcome, SelectOutcome::EditDecisionOpened);
        assert_eq!(orch.pending_edit().as_deref(), Some("mysql"));
        assert!(orch.dialog().is_none());

        orch.edit_source("mysql").expect("edit");
        let dialog = orch.dialog().expect("dialog reopened");
        assert_eq!(dialog.form, ConnectionForm::default());
        assert!(!dialog.test_passed);
        assert!(!orch.status_new("mysql"));
        assert_eq!(orch.kind_state("mysql"), KindState::Configuring);
    }

    #[tokio::test]
    async fn disconnect_clears_selection_flags_and_claim() {
        let (_, orch) = harness();
        orch.select_source("mysql").expect("select");
        orch.test_connection().await.expect("test");
        orch.set_form(filled_form()).expect("form");
        let saved = match orch.save_connection().await.expect("save") {
            SaveOutcome::Saved(record) => record,
            other => panic!("expected Saved, got {other:?}"),
        };

        orch.disconnect_source("mysql").expect("disconnect");
        assert!(orch.draft_selection().is_empty());
        assert!(!orch.status_new("mysql"));
        assert_eq!(orch.kind_state("mysql"), KindState::Unselected);

        let entry = orch.store().get(&saved.connector_id).expect("entry");
        assert_eq!(entry.status, ClaimStatus::Available);
        assert!(!entry.recently_added);
    }

    #[tokio::test]
    async fn toggle_claims_then_releases_back_to_available() {
        let registry = Arc::new(MockRegistry::new());
        let clock = Arc::new(InstantClock::new());
        let orch = SourceOrchestrator::new(
            registry,
            ConnectionStore::new(),
            NotificationSink::new(),
            clock.clone(),
            LatencyConfig::default(),
        );
        orch.store()
            .replace_all(vec![connection_record("c-1", "postgres")]);
        let id = ConnectionId::from("c-1");

        // Release before any claim is a no-op.
        assert_eq!(
            orch.release_connection(&id).await.expect("release"),
            ToggleOutcome::NoOp
        );

        assert_eq!(
            orch.toggle_connection(&id).await.expect("claim"),
            ToggleOutcome::Claimed
        );
        assert!(orch.store().get(&id).expect("entry").status.in_use());

        assert_eq!(
            orch.toggle_connection(&id).await.expect("release"),
            ToggleOutcome::Released
        );
        assert_eq!(
            orch.store().get(&id).expect("entry").status,
            ClaimStatus::Available
        );
        assert_eq!(
            clock.slept(),
            vec![Duration::from_millis(1200), Duration::from_millis(800)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn claim_in_flight_disables_the_toggle() {
        let orch = Arc::new(SourceOrchestrator::new(
            Arc::new(MockRegistry::new()),
            ConnectionStore::new(),
            NotificationSink::new(),
            Arc::new(TokioClock),
            LatencyConfig::default(),
        ));
        orch.store()
            .replace_all(vec![connection_record("c-1", "postgres")]);
        let id = ConnectionId::from("c-1");

        let worker = orch.clone();
        let first = {
            let id = id.clone();
            tokio::spawn(async move { worker.toggle_connection(&id).await })
        };
        tokio::task::yield_now().await;

        let second = orch.toggle_connection(&id).await.expect("second toggle");
        assert_eq!(second, ToggleOutcome::Busy);

        let first = first.await.expect("join").expect("first toggle");
        assert_eq!(first, ToggleOutcome::Claimed);
    }

    #[tokio::test]
    async fn deleting_the_session_saved_connection_demotes_the_kind() {
        let (_, orch) = harness();
        orch.select_source("mysql").expect("select");
        orch.test_connection().await.expect("test");
        orch.set_form(filled_form()).expect("form");
        let saved = match orch.save_connection().await.expect("save") {
            SaveOutcome::Saved(record) => record,
            other => panic!("expected Saved, got {other:?}"),
        };
        assert!(orch.readiness());

        orch.request_delete(&saved.connector_id).expect("request");
        let outcome = orch.confirm_delete().await.expect("confirm");
        assert_eq!(outcome, DeleteOutcome::Deleted);

        assert!(orch.store().get(&saved.connector_id).is_none());
        assert!(!orch.status_new("mysql"));
        assert!(!orch.readiness());
    }

    #[tokio::test]
    async fn confirm_delete_without_a_pending_target_is_a_state_error() {
        let (registry, orch) = harness();
        let err = orch.confirm_delete().await.expect_err("nothing pending");
        assert_matches!(err, OrchestratorError::State { .. });
        assert!(registry.calls().is_empty());
        assert_eq!(
            orch.sink().latest().expect("notified").message,
            "Delete failed: no connection selected"
        );
    }

    #[tokio::test]
    async fn update_applies_the_returned_record_to_the_mirror() {
        let (_, orch) = harness();
        orch.store()
            .replace_all(vec![connection_record("c-1", "postgres")]);
        let id = ConnectionId::from("c-1");

        let patch = ConnectionPatch {
            host: Some("db2.internal".into()),
            ..Default::default()
        };
        let outcome = orch.update_existing(&id, &patch).await.expect("update");
        assert_matches!(outcome, UpdateOutcome::Updated(_));
        assert_eq!(orch.store().get(&id).expect("entry").record.host, "db2.internal");
    }

    #[test]
    fn picker_and_drop_add_the_upload_source_exactly_once() {
        let (_, orch) = harness();
        assert!(!orch.readiness());

        // Picker adds one file, drag-drop adds two more (one a rename of
        // the same name, which replaces).
        orch.add_files(vec![FileEntry::in_memory("sales.csv", vec![1, 2])]);
        assert!(orch.readiness());
        orch.add_files(vec![
            FileEntry::in_memory("users.csv", vec![3]),
            FileEntry::in_memory("sales.csv", vec![4, 5, 6]),
        ]);

        let uploads: Vec<_> = orch
            .draft_selection()
            .into_iter()
            .filter(|k| k == UPLOAD_KIND)
            .collect();
        assert_eq!(uploads.len(), 1);

        let files = orch.batch_files();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].size, 3);
    }

    #[tokio::test]
    async fn upload_failure_leaves_the_batch_for_retry() {
        let (registry, orch) = harness();
        registry.push_upload(Err(server_error(500)));
        orch.add_files(vec![FileEntry::in_memory("sales.csv", vec![1])]);

        let outcome = orch.submit_batch().await.expect("submit");
        assert_eq!(outcome, UploadOutcome::Failed);
        assert_eq!(orch.batch_files().len(), 1);
        assert_eq!(
            orch.sink().latest().expect("notified").message,
            "Upload Failed!"
        );

        // And success does not clear it either; the product is still
        // being assembled.
        let outcome = orch.submit_batch().await.expect("retry");
        assert_matches!(outcome, UploadOutcome::Uploaded(_));
        assert_eq!(orch.batch_files().len(), 1);
    }

    #[tokio::test]
    async fn download_timeout_is_reported_as_no_response() {
        let (registry, orch) = harness();
        registry.push_download(Err(timeout_error()));

        let err = orch.download_agent().await.expect_err("timed out");
        assert_matches!(err, OrchestratorError::Client { .. });
        assert_eq!(
            orch.sink().latest().expect("notified").message,
            "No response from server"
        );
    }

    #[tokio::test]
    async fn reset_clears_the_draft_but_not_the_mirror() {
        let (_, orch) = harness();
        orch.store()
            .replace_all(vec![connection_record("c-1", "postgres")]);
        let id = ConnectionId::from("c-1");
        orch.toggle_connection(&id).await.expect("claim");

        orch.select_source("mysql").expect("select");
        orch.test_connection().await.expect("test");
        orch.add_files(vec![FileEntry::in_memory("sales.csv", vec![1])]);

        orch.reset();
        assert!(orch.draft_selection().is_empty());
        assert!(orch.batch_files().is_empty());
        assert!(!orch.readiness());
        assert!(orch.dialog().is_none());

        // Persisted connections and their claims survive the reset.
        let entry = orch.store().get(&id).expect("entry");
        assert!(entry.status.in_use());
    }

    #[tokio::test]
    async fn refresh_pulls_the_mirror_from_the_server() {
        let (registry, orch) = harness();
        registry.push_list(Ok(vec![
            connection_record("c-1", "postgres"),
            connection_record("c-2", "mysql"),
        ]));

        let count = orch.refresh_connections().await.expect("refresh");
        assert_eq!(count, 2);
        assert_eq!(orch.store().list().len(), 2);
    }
}
