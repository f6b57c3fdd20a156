//! OffSec HTTP Adapter
//!
//! Implements `OffsecApi` over reqwest. One request per call, no retry.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::ConsoleConfig;
use crate::domain::{ActionSubmission, ConsoleError, ProofBundle, Receipt};
use crate::ports::outbound::OffsecApi;

/// `GET /root` body: `{"root": ...}` or a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RootResponse {
    Object {
        #[serde(default)]
        root: Option<String>,
    },
    Bare(String),
}

impl RootResponse {
    fn into_root(self) -> String {
        match self {
            RootResponse::Object { root } => root.unwrap_or_default(),
            RootResponse::Bare(root) => root,
        }
    }
}

/// HTTP client for the OffSec API.
pub struct HttpOffsecApi {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpOffsecApi {
    /// Create a client for `config.http_base`.
    pub fn new(config: &ConsoleConfig) -> Result<Self, ConsoleError> {
        let base = Url::parse(&config.http_base)
            .map_err(|e| ConsoleError::InvalidConfig(format!("http_base: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ConsoleError::InvalidConfig(format!(
                "http_base cannot be a base URL: {}",
                config.http_base
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.request_timeout_secs.min(5)))
            .build()
            .map_err(|e| ConsoleError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base,
            token: config.api_token.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        endpoint_url(&self.base, segments)
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<reqwest::Response, ConsoleError> {
        let response = request.send().await.map_err(|e| ConsoleError::Request {
            endpoint: endpoint.to_string(),
            reason: if e.is_timeout() {
                "timed out".to_string()
            } else if e.is_connect() {
                format!("cannot connect to {}", self.base)
            } else {
                e.to_string()
            },
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConsoleError::RequestStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, url: Url) -> Result<T, ConsoleError> {
        debug!("[shield] GET {}", url);
        let response = self.send(endpoint, self.client.get(url)).await?;
        response.json::<T>().await.map_err(|e| ConsoleError::Request {
            endpoint: endpoint.to_string(),
            reason: format!("invalid body: {e}"),
        })
    }
}

/// Append percent-encoded path segments to `base`.
pub fn endpoint_url(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Receipts listing URL, optionally scoped to one guardian.
pub fn receipts_url(base: &Url, guardian_id: Option<&str>) -> Url {
    let mut url = endpoint_url(base, &["receipts"]);
    if let Some(id) = guardian_id {
        url.query_pairs_mut().append_pair("guardian_id", id);
    }
    url
}

#[async_trait]
impl OffsecApi for HttpOffsecApi {
    async fn fetch_current_root(&self) -> Result<String, ConsoleError> {
        let body: RootResponse = self.get_json("/root", self.url(&["root"])).await?;
        Ok(body.into_root())
    }

    async fn fetch_receipts(&self, guardian_id: Option<&str>) -> Result<Vec<Receipt>, ConsoleError> {
        self.get_json("/receipts", receipts_url(&self.base, guardian_id))
            .await
    }

    async fn apply_action(
        &self,
        submission: &ActionSubmission,
    ) -> Result<serde_json::Value, ConsoleError> {
        let endpoint = "/action/apply";
        let url = self.url(&["action", "apply"]);
        debug!("[shield] POST {} action_id={}", url, submission.action_id);

        let mut request = self.client.post(url).json(submission);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = self.send(endpoint, request).await?;

        let text = response.text().await.map_err(|e| ConsoleError::Request {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }

    async fn fetch_proof(&self, id: &str) -> Result<ProofBundle, ConsoleError> {
        self.get_json("/proof", self.url(&["proof", id])).await
    }

    async fn fetch_mesh_proof(
        &self,
        peer_id: &str,
        receipt_id: &str,
    ) -> Result<ProofBundle, ConsoleError> {
        self.get_json("/mesh/proof", self.url(&["mesh", "proof", peer_id, receipt_id]))
            .await
    }
}
