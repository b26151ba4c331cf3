use crate::transport::AuthTransport;
use crate::{ClientError, RegistryApi};
use async_trait::async_trait;
use common::config::StudioConfig;
use common::types::{
    AgentArtifact, ConnectionId, ConnectionPatch, ConnectionRecord, FileEntry, FileSource,
    HealthProbe, NewConnection, UploadReceipt,
};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use std::time::Duration;

const CONNECTIONS_PATH: &str = "api/product/source/connections/";
const HEALTH_PATH: &str = "api/connector/health/";
const DOWNLOAD_PATH: &str = "api/connector/download/";
const UPLOAD_PATH: &str = "api/product/source/uploadFile/";

/// Fallback when the server omits a usable Content-Disposition.
pub const DEFAULT_AGENT_FILENAME: &str = "local_connector.zip";

/// Multipart field name the upload endpoint expects for every file.
const UPLOAD_FIELD: &str = "file";

/// Registry client over the authenticated transport.
pub struct HttpRegistryClient {
    transport: AuthTransport,
    health_timeout: Duration,
    download_timeout: Duration,
}

impl HttpRegistryClient {
    pub fn new(config: &StudioConfig) -> Result<Self, ClientError> {
        let transport = AuthTransport::new(&config.api_base_url, config.request_timeout())?;
        Ok(Self::with_transport(transport, config))
    }

    pub fn with_transport(transport: AuthTransport, config: &StudioConfig) -> Self {
        Self {
            transport,
            health_timeout: config.health_timeout(),
            download_timeout: config.download_timeout(),
        }
    }

    pub fn transport(&self) -> &AuthTransport {
        &self.transport
    }

    fn connection_path(id: &ConnectionId) -> String {
        format!("{CONNECTIONS_PATH}{id}/")
    }

    async fn expect_success(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(rejection_from_body(status.as_u16(), &body))
    }
}

/// Non-2xx normalization: prefer the body's `detail`, fall back to a
/// generic message keyed by status.
fn rejection_from_body(status: u16, body: &str) -> ClientError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail")?.as_str().map(str::to_owned));
    match detail {
        Some(detail) => ClientError::rejection(status, detail),
        None => ClientError::rejection(status, format!("server returned HTTP {status}")),
    }
}

/// The download endpoint can wrap an error body in a success status;
/// only these content types are trusted as the real artifact.
fn is_binary_payload(content_type: &str) -> bool {
    content_type.contains("application/zip") || content_type.contains("application/octet-stream")
}

/// Pull the suggested filename out of a Content-Disposition header.
fn attachment_filename(disposition: &str) -> Option<String> {
    let (_, raw) = disposition.split_once("filename=")?;
    let name = raw
        .split(';')
        .next()
        .unwrap_or(raw)
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_owned();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[async_trait]
impl RegistryApi for HttpRegistryClient {
    async fn list_connections(&self) -> Result<Vec<ConnectionRecord>, ClientError> {
        let url = self.transport.url(CONNECTIONS_PATH);
        let response = self.transport.send(|http| http.get(&url)).await?;
        let response = Self::expect_success(response).await?;
        response.json().await.map_err(ClientError::from_reqwest)
    }

    async fn create_connection(
        &self,
        payload: &NewConnection,
    ) -> Result<ConnectionRecord, ClientError> {
        let url = self.transport.url(CONNECTIONS_PATH);
        let response = self
            .transport
            .send(|http| http.post(&url).json(payload))
            .await?;
        let response = Self::expect_success(response).await?;
        response.json().await.map_err(ClientError::from_reqwest)
    }

    async fn update_connection(
        &self,
        id: &ConnectionId,
        patch: &ConnectionPatch,
    ) -> Result<ConnectionRecord, ClientError> {
        let url = self.transport.url(&Self::connection_path(id));
        let response = self
            .transport
            .send(|http| http.patch(&url).json(patch))
            .await?;
        let response = Self::expect_success(response).await?;
        response.json().await.map_err(ClientError::from_reqwest)
    }

    async fn delete_connection(&self, id: &ConnectionId) -> Result<(), ClientError> {
        let url = self.transport.url(&Self::connection_path(id));
        let response = self.transport.send(|http| http.delete(&url)).await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn health_check(&self, probe: &HealthProbe) -> Result<(), ClientError> {
        let url = self.transport.url(HEALTH_PATH);
        let timeout = self.health_timeout;
        let response = self
            .transport
            .send(|http| http.post(&url).timeout(timeout).json(probe))
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn download_agent(&self) -> Result<AgentArtifact, ClientError> {
        let url = self.transport.url(DOWNLOAD_PATH);
        let timeout = self.download_timeout;
        let response = self
            .transport
            .send(|http| http.get(&url).timeout(timeout))
            .await?;
        let response = Self::expect_success(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if !is_binary_payload(&content_type) {
            // Error body disguised with a success status.
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            log::warn!("agent download returned '{content_type}' instead of an archive");
            return Err(rejection_from_body(status, &body));
        }

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_filename)
            .unwrap_or_else(|| DEFAULT_AGENT_FILENAME.to_owned());

        let bytes = response.bytes().await.map_err(ClientError::from_reqwest)?;
        Ok(AgentArtifact {
            filename,
            bytes: bytes.to_vec(),
        })
    }

    async fn upload_batch(&self, files: &[FileEntry]) -> Result<UploadReceipt, ClientError> {
        // Stage the bytes up front; the form itself is rebuilt per attempt
        // because the transport may replay the request after a refresh.
        let mut staged: Vec<(String, Vec<u8>)> = Vec::with_capacity(files.len());
        for entry in files {
            let bytes = match &entry.source {
                FileSource::Memory(bytes) => bytes.clone(),
                FileSource::Path(path) => tokio::fs::read(path).await?,
            };
            staged.push((entry.name.clone(), bytes));
        }

        let url = self.transport.url(UPLOAD_PATH);
        let response = self
            .transport
            .send(|http| {
                let mut form = Form::new();
                for (name, bytes) in &staged {
                    form = form.part(
                        UPLOAD_FIELD,
                        Part::bytes(bytes.clone()).file_name(name.clone()),
                    );
                }
                http.post(&url).multipart(form)
            })
            .await?;
        let response = Self::expect_success(response).await?;

        // The upload endpoint's body shape is loose; fall back to a
        // client-side receipt when it does not parse.
        let fallback = files.len();
        Ok(response.json().await.unwrap_or(UploadReceipt {
            uploaded: fallback,
            detail: None,
        }))
    }
}
