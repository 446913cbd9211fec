use crate::error::{DtreeError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// JjConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JjConfig {
    #[serde(default = "default_jj_binary")]
    pub binary: String,
}

fn default_jj_binary() -> String {
    "jj".to_string()
}

impl Default for JjConfig {
    fn default() -> Self {
        Self {
            binary: default_jj_binary(),
        }
    }
}

// ---------------------------------------------------------------------------
// BeadsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeadsConfig {
    #[serde(default = "default_bd_binary")]
    pub binary: String,
    /// `bd create` hangs outside a git repository; it is killed after this.
    #[serde(default = "default_create_timeout")]
    pub create_timeout_secs: u64,
    #[serde(default = "default_priority")]
    pub default_priority: u32,
}

fn default_bd_binary() -> String {
    "bd".to_string()
}

fn default_create_timeout() -> u64 {
    3
}

fn default_priority() -> u32 {
    2
}

impl Default for BeadsConfig {
    fn default() -> Self {
        Self {
            binary: default_bd_binary(),
            create_timeout_secs: default_create_timeout(),
            default_priority: default_priority(),
        }
    }
}

impl BeadsConfig {
    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// ShortcutConfig / NotionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortcutConfig {
    #[serde(default = "default_shortcut_url")]
    pub base_url: String,
}

fn default_shortcut_url() -> String {
    "https://api.app.shortcut.com/api/v3".to_string()
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        Self {
            base_url: default_shortcut_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default = "default_notion_url")]
    pub base_url: String,
    #[serde(default = "default_notion_version")]
    pub version: String,
}

fn default_notion_url() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_notion_version() -> String {
    "2022-06-28".to_string()
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            base_url: default_notion_url(),
            version: default_notion_version(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Contents of `.dtree/config.yaml`. Every field has a default, so the file
/// is optional and may be partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub jj: JjConfig,
    #[serde(default)]
    pub beads: BeadsConfig,
    #[serde(default)]
    pub shortcut: ShortcutConfig,
    #[serde(default)]
    pub notion: NotionConfig,
    #[serde(default = "default_log_limit")]
    pub log_limit: usize,
}

fn default_log_limit() -> usize {
    jj_driver::workflow::DEFAULT_LOG_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jj: JjConfig::default(),
            beads: BeadsConfig::default(),
            shortcut: ShortcutConfig::default(),
            notion: NotionConfig::default(),
            log_limit: default_log_limit(),
        }
    }
}

impl Config {
    /// Load the project config, falling back to defaults when the file does
    /// not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Write atomically through a tempfile in the same directory.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let dir = path.parent().unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level, message: String| warnings.push(ConfigWarning { level, message });

        if self.jj.binary.trim().is_empty() {
            push(WarnLevel::Error, "jj.binary is empty".to_string());
        }
        if self.beads.binary.trim().is_empty() {
            push(WarnLevel::Error, "beads.binary is empty".to_string());
        }

        // A zero deadline would kill every `bd create` immediately.
        if self.beads.create_timeout_secs == 0 {
            push(
                WarnLevel::Error,
                "beads.create_timeout_secs must be at least 1".to_string(),
            );
        } else if self.beads.create_timeout_secs > 60 {
            push(
                WarnLevel::Warning,
                format!(
                    "beads.create_timeout_secs={} (>60 is unusual)",
                    self.beads.create_timeout_secs
                ),
            );
        }

        if self.beads.default_priority > 4 {
            push(
                WarnLevel::Warning,
                format!(
                    "beads.default_priority={} is outside bd's 0-4 range",
                    self.beads.default_priority
                ),
            );
        }

        for (key, url) in [
            ("shortcut.base_url", &self.shortcut.base_url),
            ("notion.base_url", &self.notion.base_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                push(
                    WarnLevel::Error,
                    format!("{key} '{url}' is not an http(s) URL"),
                );
            }
        }

        if self.notion.version.trim().is_empty() {
            push(WarnLevel::Error, "notion.version is empty".to_string());
        }

        if self.log_limit == 0 {
            push(
                WarnLevel::Warning,
                "log_limit=0 makes `jj log` return nothing".to_string(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// API tokens
// ---------------------------------------------------------------------------

/// Where an API token is looked up: the `var` environment variable, then
/// `mcpServers.<server>.env.<var>` in `~/.claude.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSource {
    pub var: &'static str,
    pub server: &'static str,
}

pub const SHORTCUT_TOKEN: TokenSource = TokenSource {
    var: "SHORTCUT_API_TOKEN",
    server: "shortcut",
};

pub const NOTION_TOKEN: TokenSource = TokenSource {
    var: "NOTION_TOKEN",
    server: "notion",
};

impl TokenSource {
    pub fn resolve(&self) -> Result<String> {
        if let Ok(value) = std::env::var(self.var) {
            if !value.trim().is_empty() {
                return Ok(value);
            }
        }
        let home = home::home_dir().ok_or(DtreeError::HomeNotFound)?;
        self.from_claude_json(&paths::claude_json_path(&home))?
            .ok_or(DtreeError::TokenMissing {
                var: self.var,
                server: self.server,
            })
    }

    /// Token from a `.claude.json` file, `None` when the file or key is
    /// absent.
    pub fn from_claude_json(&self, path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        let doc: serde_json::Value = serde_json::from_str(&data)?;
        let pointer = format!("/mcpServers/{}/env/{}", self.server, self.var);
        Ok(doc
            .pointer(&pointer)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.beads.create_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.log_limit, 10);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(paths::DTREE_DIR)).unwrap();
        std::fs::write(
            paths::config_path(dir.path()),
            "beads:\n  binary: /opt/bin/bd\nlog_limit: 25\n",
        )
        .unwrap();

        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.beads.binary, "/opt/bin/bd");
        assert_eq!(cfg.beads.default_priority, 2);
        assert_eq!(cfg.jj.binary, "jj");
        assert_eq!(cfg.log_limit, 25);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.notion.version = "2025-09-03".to_string();
        cfg.save(dir.path()).unwrap();

        assert_eq!(Config::load(dir.path()).unwrap(), cfg);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(paths::DTREE_DIR)).unwrap();
        std::fs::write(paths::config_path(dir.path()), "log_limit: [not a number\n").unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(DtreeError::Yaml(_))
        ));
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut cfg = Config::default();
        cfg.beads.create_timeout_secs = 0;
        cfg.beads.default_priority = 9;
        cfg.shortcut.base_url = "api.app.shortcut.com".to_string();
        cfg.log_limit = 0;

        let warnings = cfg.validate();
        let errors: Vec<_> = warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message.as_str())
            .collect();
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors.iter().any(|m| m.contains("create_timeout_secs")));
        assert!(errors.iter().any(|m| m.contains("shortcut.base_url")));
        assert_eq!(warnings.len(), 4);
    }

    #[test]
    fn token_from_claude_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(paths::CLAUDE_JSON);
        std::fs::write(
            &path,
            r#"{"mcpServers":{"shortcut":{"command":"npx","env":{"SHORTCUT_API_TOKEN":"sc-secret"}}}}"#,
        )
        .unwrap();

        assert_eq!(
            SHORTCUT_TOKEN.from_claude_json(&path).unwrap().as_deref(),
            Some("sc-secret")
        );
        assert_eq!(NOTION_TOKEN.from_claude_json(&path).unwrap(), None);
        assert_eq!(
            NOTION_TOKEN
                .from_claude_json(&dir.path().join("absent.json"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn token_missing_message_names_both_sources() {
        let err = DtreeError::TokenMissing {
            var: NOTION_TOKEN.var,
            server: NOTION_TOKEN.server,
        };
        let msg = err.to_string();
        assert!(msg.contains("NOTION_TOKEN"), "{msg}");
        assert!(msg.contains("mcpServers.notion.env"), "{msg}");
    }
}
