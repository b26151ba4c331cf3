//! Shared fixtures and doubles for the studio_core test suites.

use async_trait::async_trait;
use common::types::{
    AgentArtifact, ConnectionId, ConnectionPatch, ConnectionRecord, FileEntry, HealthProbe,
    NewConnection, UploadReceipt,
};
use parking_lot::Mutex;
use shared_clients::{ClientError, RegistryApi};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mirror record fixture with the fields the duplicate probe looks at.
pub fn connection_record(id: &str, kind: &str) -> ConnectionRecord {
    ConnectionRecord {
        connector_id: ConnectionId::from(id),
        kind: kind.to_owned(),
        name: kind.to_owned(),
        host: "db.internal".to_owned(),
        port: "5432".to_owned(),
        username: "svc".to_owned(),
        database: "analytics".to_owned(),
        created_at: None,
        updated_at: None,
    }
}

pub fn server_error(status: u16) -> ClientError {
    ClientError::rejection(status, format!("server returned HTTP {status}"))
}

pub fn timeout_error() -> ClientError {
    ClientError::no_response("request deadline exceeded")
}

/// Scripted registry double. Each operation pops its response queue and
/// falls back to a benign default when the queue is empty; every call is
/// recorded for assertion.
#[derive(Default)]
pub struct MockRegistry {
    list_responses: Mutex<VecDeque<Result<Vec<ConnectionRecord>, ClientError>>>,
    create_responses: Mutex<VecDeque<Result<ConnectionRecord, ClientError>>>,
    update_responses: Mutex<VecDeque<Result<ConnectionRecord, ClientError>>>,
    delete_responses: Mutex<VecDeque<Result<(), ClientError>>>,
    health_responses: Mutex<VecDeque<Result<(), ClientError>>>,
    download_responses: Mutex<VecDeque<Result<AgentArtifact, ClientError>>>,
    upload_responses: Mutex<VecDeque<Result<UploadReceipt, ClientError>>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_list(&self, response: Result<Vec<ConnectionRecord>, ClientError>) {
        self.list_responses.lock().push_back(response);
    }

    pub fn push_create(&self, response: Result<ConnectionRecord, ClientError>) {
        self.create_responses.lock().push_back(response);
    }

    pub fn push_update(&self, response: Result<ConnectionRecord, ClientError>) {
        self.update_responses.lock().push_back(response);
    }

    pub fn push_delete(&self, response: Result<(), ClientError>) {
        self.delete_responses.lock().push_back(response);
    }

    pub fn push_health(&self, response: Result<(), ClientError>) {
        self.health_responses.lock().push_back(response);
    }

    pub fn push_download(&self, response: Result<AgentArtifact, ClientError>) {
        self.download_responses.lock().push_back(response);
    }

    pub fn push_upload(&self, response: Result<UploadReceipt, ClientError>) {
        self.upload_responses.lock().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl RegistryApi for MockRegistry {
    async fn list_connections(&self) -> Result<Vec<ConnectionRecord>, ClientError> {
        self.record("list_connections");
        self.list_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn create_connection(
        &self,
        payload: &NewConnection,
    ) -> Result<ConnectionRecord, ClientError> {
        self.record(format!("create_connection:{}", payload.kind));
        self.create_responses.lock().pop_front().unwrap_or_else(|| {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ConnectionRecord {
                connector_id: ConnectionId::new(format!("c-{n}")),
                kind: payload.kind.clone(),
                name: payload.name.clone(),
                host: payload.host.clone(),
                port: payload.port.clone(),
                username: payload.username.clone(),
                database: payload.database.clone(),
                created_at: None,
                updated_at: None,
            })
        })
    }

    async fn update_connection(
        &self,
        id: &ConnectionId,
        patch: &ConnectionPatch,
    ) -> Result<ConnectionRecord, ClientError> {
        self.record(format!("update_connection:{id}"));
        self.update_responses.lock().pop_front().unwrap_or_else(|| {
            let mut record = connection_record(id.as_str(), "postgres");
            if let Some(name) = &patch.name {
                record.name = name.clone();
            }
            if let Some(host) = &patch.host {
                record.host = host.clone();
            }
            if let Some(port) = &patch.port {
                record.port = port.clone();
            }
            if let Some(username) = &patch.username {
                record.username = username.clone();
            }
            if let Some(database) = &patch.database {
                record.database = database.clone();
            }
            Ok(record)
        })
    }

    async fn delete_connection(&self, id: &ConnectionId) -> Result<(), ClientError> {
        self.record(format!("delete_connection:{id}"));
        self.delete_responses.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn health_check(&self, probe: &HealthProbe) -> Result<(), ClientError> {
        self.record(format!("health_check:{}", probe.url));
        self.health_responses.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn download_agent(&self) -> Result<AgentArtifact, ClientError> {
        self.record("download_agent");
        self.download_responses.lock().pop_front().unwrap_or_else(|| {
            Ok(AgentArtifact {
                filename: "local_connector.zip".to_owned(),
                bytes: vec![0x50, 0x4b, 0x03, 0x04],
            })
        })
    }

    async fn upload_batch(&self, files: &[FileEntry]) -> Result<UploadReceipt, ClientError> {
        self.record(format!("upload_batch:{}", files.len()));
        self.upload_responses.lock().pop_front().unwrap_or_else(|| {
            Ok(UploadReceipt {
                uploaded: files.len(),
                detail: None,
            })
        })
    }
}
