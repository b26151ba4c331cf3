mod connections;
mod connectors;
mod files;

pub use connections::{
    handle_connections, handle_delete, handle_save, handle_test, handle_update, DeleteArgs,
    SaveArgs, TestArgs, UpdateArgs,
};
pub use connectors::{handle_connectors, ConnectorsArgs};
pub use files::{handle_download, handle_upload, DownloadArgs, UploadArgs};

use common::config::{read_config, StudioConfig};
use common::error::StudioError;
use orchestrator::{StudioFlow, TokioClock};
use shared_clients::{HttpRegistryClient, SessionTokens};
use std::path::PathBuf;
use std::sync::Arc;

/// Session tokens come from the environment; the studio binary does not
/// run the login flow itself.
const ACCESS_TOKEN_ENV: &str = "STUDIO_ACCESS_TOKEN";
const REFRESH_TOKEN_ENV: &str = "STUDIO_REFRESH_TOKEN";

pub(crate) fn load_config(path: Option<PathBuf>) -> Result<StudioConfig, StudioError> {
    read_config(path.as_deref()).map_err(StudioError::startup)
}

pub(crate) fn build_flow(config: &StudioConfig) -> Result<StudioFlow, StudioError> {
    let client = HttpRegistryClient::new(config).map_err(StudioError::startup)?;
    client.transport().set_tokens(SessionTokens {
        access: std::env::var(ACCESS_TOKEN_ENV).ok().filter(|t| !t.is_empty()),
        refresh: std::env::var(REFRESH_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty()),
    });
    Ok(StudioFlow::new(
        Arc::new(client),
        Arc::new(TokioClock),
        config.latency.clone(),
    ))
}

pub(crate) fn print_notifications(flow: &StudioFlow) {
    for note in flow.orchestrator().sink().drain() {
        println!("[{}] {}", note.severity, note.message);
    }
}
