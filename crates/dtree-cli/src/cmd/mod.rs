pub mod config;
pub mod jj;
pub mod page;
pub mod story;
pub mod task;
pub mod tree;
pub mod workflow;

use anyhow::Context;
use dtree_core::config::{Config, NOTION_TOKEN, SHORTCUT_TOKEN};
use dtree_core::{Beads, Notion, NotionRestClient, Shortcut, ShortcutRestClient};
use jj_driver::JjWorkflow;
use std::path::Path;
use std::sync::Arc;

pub(crate) fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load config")
}

pub(crate) fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start tokio runtime")
}

/// `bd` bound to the project root with the configured binary and limits.
pub(crate) fn beads(root: &Path, config: &Config) -> Beads {
    Beads::new(root)
        .binary(&config.beads.binary)
        .create_timeout(config.beads.create_timeout())
        .default_priority(config.beads.default_priority)
}

/// `jj` workflow with the project root already set as its repository.
pub(crate) async fn open_jj(root: &Path, config: &Config) -> anyhow::Result<JjWorkflow> {
    let mut jj = unbound_jj(config);
    jj.set_repository(root)
        .await
        .with_context(|| format!("failed to open jj repository at {}", root.display()))?;
    Ok(jj)
}

pub(crate) fn unbound_jj(config: &Config) -> JjWorkflow {
    JjWorkflow::new().binary(&config.jj.binary)
}

pub(crate) fn shortcut(config: &Config) -> anyhow::Result<Shortcut> {
    let token = SHORTCUT_TOKEN
        .resolve()
        .context("cannot configure the Shortcut client")?;
    let client = ShortcutRestClient::new(&config.shortcut.base_url, token);
    Ok(Shortcut::with_client(Arc::new(client)))
}

pub(crate) fn notion(config: &Config) -> anyhow::Result<Notion> {
    let token = NOTION_TOKEN
        .resolve()
        .context("cannot configure the Notion client")?;
    let client = NotionRestClient::new(&config.notion.base_url, token, &config.notion.version);
    Ok(Notion::with_client(Arc::new(client)))
}
