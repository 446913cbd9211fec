use jj_driver::{JjError, ProcessError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DtreeError {
    #[error("bd operation timed out - workspace may not be a git repository")]
    BdTimeout,

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("dependency cycle detected at task {0}")]
    CycleDetected(String),

    #[error("{0}")]
    ClientNotConfigured(&'static str),

    #[error("{0}")]
    InvalidResponse(String),

    #[error("invalid parameters for {tool}: {reason}")]
    InvalidParams { tool: String, reason: String },

    #[error("unsupported tool: {0}")]
    UnsupportedTool(String),

    #[error("{service} API error: {status} {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{var} not found: set it in the environment or in ~/.claude.json under mcpServers.{server}.env")]
    TokenMissing {
        var: &'static str,
        server: &'static str,
    },

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Jj(#[from] JjError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DtreeError>;
