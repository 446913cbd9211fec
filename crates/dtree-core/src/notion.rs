//! Notion pages through an injected API client.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DtreeError, Result};

const NOT_CONFIGURED: &str = "Notion client not configured. Call Notion::set_client() first.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionPage {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// The two Notion endpoints a page read needs, returning raw JSON.
#[async_trait]
pub trait NotionApi: Send + Sync {
    async fn retrieve_page(&self, page_id: &str) -> Result<Value>;
    async fn list_block_children(&self, block_id: &str) -> Result<Value>;
}

#[derive(Clone, Default)]
pub struct Notion {
    client: Option<Arc<dyn NotionApi>>,
}

impl Notion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Arc<dyn NotionApi>) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn set_client(&mut self, client: Arc<dyn NotionApi>) {
        self.client = Some(client);
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Title and paragraph text of a page. Only `paragraph` blocks
    /// contribute, one line per non-empty paragraph.
    pub async fn page(&self, page_id: &str) -> Result<NotionPage> {
        let client = self
            .client
            .as_ref()
            .ok_or(DtreeError::ClientNotConfigured(NOT_CONFIGURED))?;

        let page = client.retrieve_page(page_id).await?;
        let title = page
            .pointer("/properties/title/title/0/plain_text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let blocks = client.list_block_children(page_id).await?;
        let results = blocks
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                DtreeError::InvalidResponse(format!(
                    "Notion block list for page {page_id} has no results array"
                ))
            })?;

        let content = results
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("paragraph"))
            .filter_map(|block| {
                block
                    .pointer("/paragraph/rich_text/0/plain_text")
                    .and_then(Value::as_str)
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(NotionPage {
            id: page_id.to_string(),
            title,
            content,
        })
    }
}

impl std::fmt::Debug for Notion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notion")
            .field("configured", &self.is_configured())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// REST-backed client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct NotionRestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    version: String,
}

impl NotionRestClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            version: version.into(),
        }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "GET notion");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.version)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Notion error bodies carry a human-readable `message`.
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());
            return Err(DtreeError::Upstream {
                service: "Notion",
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

impl std::fmt::Debug for NotionRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionRestClient")
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NotionApi for NotionRestClient {
    async fn retrieve_page(&self, page_id: &str) -> Result<Value> {
        self.get(&format!("/pages/{page_id}")).await
    }

    async fn list_block_children(&self, block_id: &str) -> Result<Value> {
        self.get(&format!("/blocks/{block_id}/children")).await
    }
}
