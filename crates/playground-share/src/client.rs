//! HTTP client for a remote share server.

use reqwest::StatusCode;
use tracing::debug;

use crate::error::{ShareError, ShareResult};
use crate::storage_traits::{ErrorBody, ShareId, ShareRecord, ShareResponse};

/// Route both share endpoints live under.
pub const SHARE_ROUTE: &str = "/api/parameters";

/// Talks to `playgroundd` or anything serving the same routes.
#[derive(Debug, Clone)]
pub struct ShareClient {
    base_url: String,
    http: reqwest::Client,
}

impl ShareClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store `code` remotely and return its id.
    pub async fn put(&self, code: &str) -> ShareResult<ShareId> {
        let record = ShareRecord::new(code);
        let url = format!("{}{}", self.base_url, SHARE_ROUTE);
        debug!(url = %url, "sharing template");

        let resp = self.http.post(&url).json(&record).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(resp.json::<ShareResponse>().await?.id),
            StatusCode::PAYLOAD_TOO_LARGE => {
                let size = record.serialized_len()?;
                let body = resp.json::<ErrorBody>().await.ok();
                Err(ShareError::PayloadTooLarge {
                    size,
                    limit: body.and_then(|b| b.limit).unwrap_or_default(),
                })
            }
            status => Err(Self::server_error(status, resp).await),
        }
    }

    /// Fetch the template stored under `id`.
    pub async fn get(&self, id: &ShareId) -> ShareResult<ShareRecord> {
        let url = format!("{}{}/{}", self.base_url, SHARE_ROUTE, id);
        debug!(url = %url, "fetching shared template");

        let resp = self.http.get(&url).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(resp.json::<ShareRecord>().await?),
            StatusCode::NOT_FOUND => Err(ShareError::NotFound { id: id.to_string() }),
            status => Err(Self::server_error(status, resp).await),
        }
    }

    async fn server_error(status: StatusCode, resp: reqwest::Response) -> ShareError {
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        ShareError::Server {
            status: status.as_u16(),
            message,
        }
    }
}
