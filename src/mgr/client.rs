//! Thin HTTP client for the sidecar / routing-engine API surface.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Serialize;

use crate::error::{Error, Result};

const AGENT_NAME: &str = concat!("alertmgr-sidecar/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct ApiClient {
    base: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(AGENT_NAME)
            .build()?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// One API call; non-2xx statuses become `Error::UpstreamStatus` with
    /// the response body as the message.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base, path);
        let mut request = self.client.request(method, &url);
        if let Some(payload) = payload {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(payload);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        if !status.is_success() {
            let message = String::from_utf8_lossy(&body)
                .trim_end_matches('\n')
                .to_string();
            tracing::debug!(%status, url, message, "api call failed");
            return Err(Error::UpstreamStatus { status, message });
        }
        Ok(body)
    }

    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.call(Method::GET, path, None).await
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, value: &T) -> Result<Vec<u8>> {
        self.call(Method::POST, path, Some(serde_json::to_vec(value)?))
            .await
    }

    pub async fn delete_json<T: Serialize>(&self, path: &str, value: &T) -> Result<Vec<u8>> {
        self.call(Method::DELETE, path, Some(serde_json::to_vec(value)?))
            .await
    }
}
