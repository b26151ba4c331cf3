pub mod error;

use crate::config::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment override for the API base URL, checked after the file.
pub const API_URL_ENV: &str = "STUDIO_API_URL";

// ---------------- client config ----------------
#[derive(Debug, Clone, Deserialize)]
pub struct StudioConfig {
    pub api_base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
    #[serde(default)]
    pub latency: LatencyConfig,
}

/// Simulated round-trip delays for the trusted paths (cloud test,
/// claim/release handshake). Injected so tests can run them instantly.
#[derive(Debug, Clone, Deserialize)]
pub struct LatencyConfig {
    #[serde(default = "default_cloud_test_ms")]
    pub cloud_test_ms: u64,
    #[serde(default = "default_claim_ms")]
    pub claim_ms: u64,
    #[serde(default = "default_release_ms")]
    pub release_ms: u64,
}

fn default_request_timeout() -> u64 {
    5
}
fn default_health_timeout() -> u64 {
    5
}
fn default_download_timeout() -> u64 {
    20
}
fn default_cloud_test_ms() -> u64 {
    1500
}
fn default_claim_ms() -> u64 {
    1200
}
fn default_release_ms() -> u64 {
    800
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            cloud_test_ms: default_cloud_test_ms(),
            claim_ms: default_claim_ms(),
            release_ms: default_release_ms(),
        }
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            request_timeout_secs: default_request_timeout(),
            health_timeout_secs: default_health_timeout(),
            download_timeout_secs: default_download_timeout(),
            latency: LatencyConfig::default(),
        }
    }
}

impl StudioConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Load the client config. Explicit path wins; otherwise defaults apply.
/// `STUDIO_API_URL` overrides the base URL either way.
pub fn read_config(path: Option<&Path>) -> Result<StudioConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p).map_err(ConfigError::io)?;
            toml::from_str(&raw).map_err(ConfigError::parse)?
        }
        None => StudioConfig::default(),
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.is_empty() {
            log::debug!("api base url overridden from {API_URL_ENV}");
            config.api_base_url = url;
        }
    }
    config.api_base_url = config.api_base_url.trim_end_matches('/').to_owned();
    Ok(config)
}
