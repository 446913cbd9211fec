//! Shortcut stories through an injected tool client.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{DtreeError, Result};

pub const GET_STORY_TOOL: &str = "stories-get-by-id";
pub const GET_BRANCH_NAME_TOOL: &str = "stories-get-branch-name";

const NOT_CONFIGURED: &str = "Shortcut MCP client not configured. Call Shortcut::set_client() first.";

/// A story as returned by Shortcut, plus the branch name of its suggested
/// git branch. Fields not modelled here are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortcutStory {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub app_url: String,
    pub branch_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// MCP-style tool caller. Results have the shape
/// `{ "content": [{ "type": "text", "text": ... }] }`.
#[async_trait]
pub trait ShortcutTools: Send + Sync {
    async fn call_tool(&self, name: &str, params: Value) -> Result<Value>;
}

/// Holder for the injected Shortcut client.
#[derive(Clone, Default)]
pub struct Shortcut {
    client: Option<Arc<dyn ShortcutTools>>,
}

impl Shortcut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Arc<dyn ShortcutTools>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Replace the client; later calls use the new one.
    pub fn set_client(&mut self, client: Arc<dyn ShortcutTools>) {
        self.client = Some(client);
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Fetch a story and its branch name. Client errors pass through
    /// unchanged; malformed results become [`DtreeError::InvalidResponse`].
    pub async fn story(&self, story_id: u64) -> Result<ShortcutStory> {
        let client = self
            .client
            .as_ref()
            .ok_or(DtreeError::ClientNotConfigured(NOT_CONFIGURED))?;

        let params = json!({ "storyPublicId": story_id });
        let story_result = client.call_tool(GET_STORY_TOOL, params.clone()).await?;
        let branch_result = client.call_tool(GET_BRANCH_NAME_TOOL, params).await?;

        parse_story(&story_result, &branch_result).map_err(|reason| {
            DtreeError::InvalidResponse(format!("Invalid response from Shortcut MCP: {reason}"))
        })
    }
}

impl std::fmt::Debug for Shortcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shortcut")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn parse_story(story_result: &Value, branch_result: &Value) -> std::result::Result<ShortcutStory, String> {
    let story_text = extract_json(first_text(story_result)?);
    let mut story: Map<String, Value> =
        serde_json::from_str(story_text).map_err(|e| e.to_string())?;

    let branch_text = extract_json(first_text(branch_result)?);
    story.insert(
        "branch_name".to_string(),
        Value::String(parse_branch_name(branch_text)),
    );

    serde_json::from_value(Value::Object(story)).map_err(|e| e.to_string())
}

fn first_text(result: &Value) -> std::result::Result<&str, String> {
    result
        .pointer("/content/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| "tool result has no text content".to_string())
}

static JSON_TAG_RE: OnceLock<Regex> = OnceLock::new();
static BRANCH_TEXT_RE: OnceLock<Regex> = OnceLock::new();

fn json_tag_re() -> &'static Regex {
    JSON_TAG_RE.get_or_init(|| Regex::new(r"(?s)<json>(.*?)</json>").unwrap())
}

fn branch_text_re() -> &'static Regex {
    BRANCH_TEXT_RE.get_or_init(|| Regex::new(r":\s*(.+)$").unwrap())
}

/// Body of a `<json>...</json>` block when present, else the whole text.
fn extract_json(text: &str) -> &str {
    json_tag_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(text)
}

/// The tool answers with either a JSON string or prose such as
/// `Branch name for story sc-1: feature/sc-1`.
fn parse_branch_name(text: &str) -> String {
    if let Ok(name) = serde_json::from_str::<String>(text) {
        return name;
    }
    branch_text_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| text.to_string())
}

// ---------------------------------------------------------------------------
// REST-backed client
// ---------------------------------------------------------------------------

/// [`ShortcutTools`] over the Shortcut REST API (`/api/v3`).
#[derive(Clone)]
pub struct ShortcutRestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ShortcutRestClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn get_story(&self, story_id: u64) -> Result<Value> {
        let url = format!("{}/stories/{story_id}", self.base_url);
        tracing::debug!(%url, "GET shortcut story");

        let response = self
            .http
            .get(&url)
            .header("Shortcut-Token", &self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DtreeError::Upstream {
                service: "Shortcut",
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

impl std::fmt::Debug for ShortcutRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortcutRestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn story_id_param(tool: &str, params: &Value) -> Result<u64> {
    params
        .get("storyPublicId")
        .and_then(Value::as_u64)
        .ok_or_else(|| DtreeError::InvalidParams {
            tool: tool.to_string(),
            reason: "storyPublicId must be a non-negative integer".to_string(),
        })
}

fn text_result(text: String) -> Value {
    json!({ "content": [{ "type": "text", "text": text }] })
}

#[async_trait]
impl ShortcutTools for ShortcutRestClient {
    async fn call_tool(&self, name: &str, params: Value) -> Result<Value> {
        match name {
            GET_STORY_TOOL => {
                let id = story_id_param(name, &params)?;
                let story = self.get_story(id).await?;
                Ok(text_result(story.to_string()))
            }
            GET_BRANCH_NAME_TOOL => {
                let id = story_id_param(name, &params)?;
                let story = self.get_story(id).await?;
                let branch = story
                    .get("suggested_branch_name")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("story-{id}"));
                Ok(text_result(Value::String(branch).to_string()))
            }
            other => Err(DtreeError::UnsupportedTool(other.to_string())),
        }
    }
}
