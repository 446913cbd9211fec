pub mod beads;
pub mod config;
pub mod error;
pub mod notion;
pub mod paths;
pub mod shortcut;
pub mod tree;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use beads::Beads;
pub use error::{DtreeError, Result};
pub use notion::{Notion, NotionApi, NotionPage, NotionRestClient};
pub use shortcut::{Shortcut, ShortcutRestClient, ShortcutStory, ShortcutTools};
pub use tree::TaskSource;
