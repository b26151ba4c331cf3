use crate::error::CatalogError;
use common::types::{ConnectionId, ConnectionRecord};
use parking_lot::RwLock;
use std::sync::Arc;

/// Claim state of one persisted connection, as seen by this client
/// session. The claim is advisory: there is no server-side lock, and two
/// sessions can both believe they hold the same connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    Available,
    Claiming,
    InUse,
    Releasing,
}

impl ClaimStatus {
    /// A claim or release handshake is in flight; the toggle stays disabled.
    pub fn busy(&self) -> bool {
        matches!(self, ClaimStatus::Claiming | ClaimStatus::Releasing)
    }

    pub fn in_use(&self) -> bool {
        matches!(self, ClaimStatus::InUse)
    }
}

/// One arena slot: the mirrored record plus its session-local state.
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub record: ConnectionRecord,
    pub status: ClaimStatus,
    pub recently_added: bool,
}

#[derive(Default)]
struct State {
    entries: Vec<ConnectionEntry>,
}

impl State {
    fn find(&self, id: &ConnectionId) -> Option<&ConnectionEntry> {
        self.entries.iter().find(|e| e.record.connector_id == *id)
    }

    fn find_mut(&mut self, id: &ConnectionId) -> Option<&mut ConnectionEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.record.connector_id == *id)
    }
}

/// Client-side mirror of the server-owned connection registry. Cheap to
/// clone; all clones share the same arena.
#[derive(Clone)]
pub struct ConnectionStore {
    inner: Arc<RwLock<State>>,
}

impl Default for ConnectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Refresh the mirror from the server. Entries whose id survives the
    /// refresh keep their claim status and session flags; everything else
    /// comes in `Available`.
    pub fn replace_all(&self, records: Vec<ConnectionRecord>) {
        let mut g = self.inner.write();
        let previous = std::mem::take(&mut g.entries);
        g.entries = records
            .into_iter()
            .map(|record| {
                let prior = previous
                    .iter()
                    .find(|e| e.record.connector_id == record.connector_id);
                ConnectionEntry {
                    record,
                    status: prior.map_or(ClaimStatus::Available, |e| e.status),
                    recently_added: prior.is_some_and(|e| e.recently_added),
                }
            })
            .collect();
    }

    /// Append a just-saved connection, claimed for the draft in the same
    /// write so no reader can observe it `Available`.
    pub fn insert_saved(&self, record: ConnectionRecord) -> Result<(), CatalogError> {
        let mut g = self.inner.write();
        if g.find(&record.connector_id).is_some() {
            return Err(CatalogError::duplicate(record.connector_id.to_string()));
        }
        g.entries.push(ConnectionEntry {
            record,
            status: ClaimStatus::InUse,
            recently_added: true,
        });
        Ok(())
    }

    pub fn remove(&self, id: &ConnectionId) -> Result<ConnectionEntry, CatalogError> {
        let mut g = self.inner.write();
        let pos = g
            .entries
            .iter()
            .position(|e| e.record.connector_id == *id)
            .ok_or_else(|| CatalogError::not_found(format!("connection '{id}' not found")))?;
        Ok(g.entries.remove(pos))
    }

    /// Replace the mirrored record after a server-side update, keeping the
    /// session-local claim state.
    pub fn apply_update(&self, record: ConnectionRecord) -> Result<(), CatalogError> {
        let mut g = self.inner.write();
        let entry = g.find_mut(&record.connector_id).ok_or_else(|| {
            CatalogError::not_found(format!("connection '{}' not found", record.connector_id))
        })?;
        entry.record = record;
        Ok(())
    }

    pub fn get(&self, id: &ConnectionId) -> Option<ConnectionEntry> {
        self.inner.read().find(id).cloned()
    }

    pub fn list(&self) -> Vec<ConnectionEntry> {
        self.inner.read().entries.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Duplicate prevention by natural key, not by identifier.
    pub fn find_duplicate(
        &self,
        kind: &str,
        host: &str,
        port: &str,
        username: &str,
        database: &str,
    ) -> Option<ConnectionRecord> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|e| {
                e.record
                    .matches_natural_key(kind, host, port, username, database)
            })
            .map(|e| e.record.clone())
    }

    /* ---------- claim transitions ---------- */

    pub fn begin_claim(&self, id: &ConnectionId) -> Result<(), CatalogError> {
        self.transition(id, |entry| match entry.status {
            ClaimStatus::Available => {
                entry.status = ClaimStatus::Claiming;
                Ok(())
            }
            ClaimStatus::Claiming | ClaimStatus::Releasing => Err(CatalogError::busy(format!(
                "connection '{}' has a handshake in flight",
                entry.record.connector_id
            ))),
            ClaimStatus::InUse => Err(CatalogError::invalid_transition(format!(
                "connection '{}' is already in use",
                entry.record.connector_id
            ))),
        })
    }

    pub fn finish_claim(&self, id: &ConnectionId) -> Result<(), CatalogError> {
        self.transition(id, |entry| match entry.status {
            ClaimStatus::Claiming => {
                entry.status = ClaimStatus::InUse;
                Ok(())
            }
            _ => Err(CatalogError::invalid_transition(format!(
                "connection '{}' has no claim in flight",
                entry.record.connector_id
            ))),
        })
    }

    /// A connection saved in this session cannot be released through the
    /// existing-connections toggle; it must go through the disconnect path.
    pub fn begin_release(&self, id: &ConnectionId) -> Result<(), CatalogError> {
        self.transition(id, |entry| match entry.status {
            ClaimStatus::InUse if entry.recently_added => Err(CatalogError::protected(format!(
                "connection '{}' was added in this session",
                entry.record.connector_id
            ))),
            ClaimStatus::InUse => {
                entry.status = ClaimStatus::Releasing;
                Ok(())
            }
            ClaimStatus::Claiming | ClaimStatus::Releasing => Err(CatalogError::busy(format!(
                "connection '{}' has a handshake in flight",
                entry.record.connector_id
            ))),
            ClaimStatus::Available => Err(CatalogError::invalid_transition(format!(
                "connection '{}' is not in use",
                entry.record.connector_id
            ))),
        })
    }

    pub fn finish_release(&self, id: &ConnectionId) -> Result<(), CatalogError> {
        self.transition(id, |entry| match entry.status {
            ClaimStatus::Releasing => {
                entry.status = ClaimStatus::Available;
                Ok(())
            }
            _ => Err(CatalogError::invalid_transition(format!(
                "connection '{}' has no release in flight",
                entry.record.connector_id
            ))),
        })
    }

    /// Disconnect path: drop the claim and the session guard regardless of
    /// the current handshake state.
    pub fn force_release(&self, id: &ConnectionId) -> Result<(), CatalogError> {
        self.transition(id, |entry| {
            entry.status = ClaimStatus::Available;
            entry.recently_added = false;
            Ok(())
        })
    }

    fn transition(
        &self,
        id: &ConnectionId,
        apply: impl FnOnce(&mut ConnectionEntry) -> Result<(), CatalogError>,
    ) -> Result<(), CatalogError> {
        let mut g = self.inner.write();
        let entry = g
            .find_mut(id)
            .ok_or_else(|| CatalogError::not_found(format!("connection '{id}' not found")))?;
        apply(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::assert_matches;
    use test_utils::connection_record;

    #[test]
    fn insert_saved_claims_atomically() {
        let store = ConnectionStore::new();
        store
            .insert_saved(connection_record("c-1", "postgres"))
            .expect("insert");

        let entry = store.get(&ConnectionId::from("c-1")).expect("entry");
        assert_eq!(entry.status, ClaimStatus::InUse);
        assert!(entry.recently_added);
    }

    #[test]
    fn insert_saved_rejects_duplicate_id() {
        let store = ConnectionStore::new();
        store
            .insert_saved(connection_record("c-1", "postgres"))
            .expect("first insert");
        let err = store
            .insert_saved(connection_record("c-1", "mysql"))
            .expect_err("second insert should fail");
        assert_matches!(err, CatalogError::Duplicate { .. });
    }

    #[test]
    fn replace_all_keeps_surviving_claims() {
        let store = ConnectionStore::new();
        store
            .insert_saved(connection_record("c-1", "postgres"))
            .expect("insert");

        store.replace_all(vec![
            connection_record("c-1", "postgres"),
            connection_record("c-2", "mysql"),
        ]);

        let kept = store.get(&ConnectionId::from("c-1")).expect("kept");
        assert_eq!(kept.status, ClaimStatus::InUse);
        assert!(kept.recently_added);
        let fresh = store.get(&ConnectionId::from("c-2")).expect("fresh");
        assert_eq!(fresh.status, ClaimStatus::Available);
        assert!(!fresh.recently_added);
    }

    #[test]
    fn duplicate_probe_matches_natural_key_only() {
        let store = ConnectionStore::new();
        store.replace_all(vec![connection_record("c-1", "postgres")]);

        assert!(store
            .find_duplicate("postgres", "db.internal", "5432", "svc", "analytics")
            .is_some());
        assert!(store
            .find_duplicate("postgres", "db.internal", "5433", "svc", "analytics")
            .is_none());
    }

    #[test]
    fn claim_then_release_restores_available() {
        let store = ConnectionStore::new();
        store.replace_all(vec![connection_record("c-1", "postgres")]);
        let id = ConnectionId::from("c-1");

        store.begin_claim(&id).expect("begin claim");
        assert!(store.get(&id).expect("entry").status.busy());
        store.finish_claim(&id).expect("finish claim");
        assert_eq!(store.get(&id).expect("entry").status, ClaimStatus::InUse);

        store.begin_release(&id).expect("begin release");
        store.finish_release(&id).expect("finish release");
        assert_eq!(
            store.get(&id).expect("entry").status,
            ClaimStatus::Available
        );
    }

    #[test]
    fn double_claim_is_rejected_while_in_flight() {
        let store = ConnectionStore::new();
        store.replace_all(vec![connection_record("c-1", "postgres")]);
        let id = ConnectionId::from("c-1");

        store.begin_claim(&id).expect("begin claim");
        let err = store.begin_claim(&id).expect_err("second claim");
        assert_matches!(err, CatalogError::Busy { .. });
    }

    #[test]
    fn recently_added_refuses_toggle_release() {
        let store = ConnectionStore::new();
        store
            .insert_saved(connection_record("c-1", "postgres"))
            .expect("insert");
        let id = ConnectionId::from("c-1");

        let err = store.begin_release(&id).expect_err("guarded");
        assert_matches!(err, CatalogError::Protected { .. });

        // The disconnect path clears both the claim and the guard.
        store.force_release(&id).expect("force release");
        let entry = store.get(&id).expect("entry");
        assert_eq!(entry.status, ClaimStatus::Available);
        assert!(!entry.recently_added);
    }

    #[test]
    fn release_requires_an_active_claim() {
        let store = ConnectionStore::new();
        store.replace_all(vec![connection_record("c-1", "postgres")]);
        let err = store
            .begin_release(&ConnectionId::from("c-1"))
            .expect_err("not in use");
        assert_matches!(err, CatalogError::InvalidTransition { .. });
    }

    #[test]
    fn unknown_id_reports_not_found() {
        let store = ConnectionStore::new();
        let err = store
            .begin_claim(&ConnectionId::from("ghost"))
            .expect_err("missing");
        assert_matches!(err, CatalogError::NotFound { .. });
    }
}
