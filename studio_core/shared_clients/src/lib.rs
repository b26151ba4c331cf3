pub mod http;
pub mod transport;

pub use http::HttpRegistryClient;
pub use transport::{AuthTransport, SessionTokens};

use async_trait::async_trait;
use common::error::DiagnosticMessage;
use common::types::{
    AgentArtifact, ConnectionId, ConnectionPatch, ConnectionRecord, FileEntry, HealthProbe,
    NewConnection, UploadReceipt,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {context}")]
    Transport {
        context: DiagnosticMessage,
        #[source]
        source: reqwest::Error,
    },
    #[error("no response from server: {context}")]
    NoResponse { context: DiagnosticMessage },
    #[error("server rejected the request (HTTP {status}): {context}")]
    ServerRejection {
        status: u16,
        context: DiagnosticMessage,
    },
    #[error("failed to decode response: {context}")]
    Decode {
        context: DiagnosticMessage,
        #[source]
        source: serde_json::Error,
    },
    #[error("authentication failed: {context}")]
    Auth { context: DiagnosticMessage },
    #[error("I/O error: {context}")]
    Io {
        context: DiagnosticMessage,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    #[track_caller]
    pub fn transport(source: reqwest::Error) -> Self {
        let message = source.to_string();
        Self::Transport {
            context: DiagnosticMessage::new(message),
            source,
        }
    }

    #[track_caller]
    pub fn no_response(message: impl Into<String>) -> Self {
        Self::NoResponse {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn rejection(status: u16, message: impl Into<String>) -> Self {
        Self::ServerRejection {
            status,
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn decode(source: serde_json::Error) -> Self {
        let message = source.to_string();
        Self::Decode {
            context: DiagnosticMessage::new(message),
            source,
        }
    }

    #[track_caller]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    /// A deadline miss is a distinct "no response" failure, not a status.
    #[track_caller]
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::NoResponse {
                context: DiagnosticMessage::new("request deadline exceeded"),
            }
        } else {
            Self::transport(err)
        }
    }
}

impl From<std::io::Error> for ClientError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        let message = err.to_string();
        ClientError::Io {
            context: DiagnosticMessage::new(message),
            source: err,
        }
    }
}

/// Remote connection-registry surface consumed by the orchestrator. A
/// trait so the reconciler can be exercised against a scripted double.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn list_connections(&self) -> Result<Vec<ConnectionRecord>, ClientError>;

    async fn create_connection(
        &self,
        payload: &NewConnection,
    ) -> Result<ConnectionRecord, ClientError>;

    async fn update_connection(
        &self,
        id: &ConnectionId,
        patch: &ConnectionPatch,
    ) -> Result<ConnectionRecord, ClientError>;

    async fn delete_connection(&self, id: &ConnectionId) -> Result<(), ClientError>;

    /// Liveness probe against a locally tunnelled agent.
    async fn health_check(&self, probe: &HealthProbe) -> Result<(), ClientError>;

    async fn download_agent(&self) -> Result<AgentArtifact, ClientError>;

    /// One multipart request carrying the whole batch.
    async fn upload_batch(&self, files: &[FileEntry]) -> Result<UploadReceipt, ClientError>;
}
