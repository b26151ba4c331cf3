use crate::ClientError;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Bearer tokens for the current session. Access is replaced in place on
/// refresh; both are dropped when a refresh is rejected.
#[derive(Debug, Default, Clone)]
pub struct SessionTokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

/// HTTP transport that attaches the bearer token to every request and, on
/// a 401, refreshes it exactly once before replaying the original request.
#[derive(Clone)]
pub struct AuthTransport {
    http: Client,
    base_url: String,
    tokens: Arc<RwLock<SessionTokens>>,
}

impl AuthTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::transport)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            tokens: Arc::new(RwLock::new(SessionTokens::default())),
        })
    }

    pub fn set_tokens(&self, tokens: SessionTokens) {
        *self.tokens.write() = tokens;
    }

    pub fn clear_tokens(&self) {
        *self.tokens.write() = SessionTokens::default();
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Dispatch a request built by `make`. The closure is invoked once per
    /// attempt so the replay after a refresh carries the new token.
    pub async fn send<F>(&self, make: F) -> Result<Response, ClientError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let first = self.dispatch(&make).await?;
        if first.status() != StatusCode::UNAUTHORIZED {
            return Ok(first);
        }

        log::info!("access token rejected; refreshing once and replaying");
        self.refresh_access().await?;
        self.dispatch(&make).await
    }

    async fn dispatch<F>(&self, make: &F) -> Result<Response, ClientError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut request = make(&self.http);
        let access = self.tokens.read().access.clone();
        if let Some(access) = access {
            request = request.bearer_auth(access);
        }
        request.send().await.map_err(ClientError::from_reqwest)
    }

    async fn refresh_access(&self) -> Result<(), ClientError> {
        let refresh = self.tokens.read().refresh.clone();
        let Some(refresh) = refresh else {
            self.clear_tokens();
            return Err(ClientError::auth("session expired and no refresh token is held"));
        };

        let response = self
            .http
            .post(self.url("api/token/refresh/"))
            .json(&json!({ "refresh": refresh }))
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            self.clear_tokens();
            return Err(ClientError::rejection(
                status,
                "token refresh was rejected; sign in again",
            ));
        }

        #[derive(Deserialize)]
        struct Refreshed {
            access: String,
        }
        let body: Refreshed = response.json().await.map_err(ClientError::from_reqwest)?;
        self.tokens.write().access = Some(body.access);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_doubled_slashes() {
        let transport =
            AuthTransport::new("https://market.example/", Duration::from_secs(5)).expect("build");
        assert_eq!(
            transport.url("/api/connector/health/"),
            "https://market.example/api/connector/health/"
        );
        assert_eq!(
            transport.url("api/product/source/connections/"),
            "https://market.example/api/product/source/connections/"
        );
    }
}
