use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single external command.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {}ms", .after.as_millis())]
    Timeout { command: String, after: Duration },

    #[error("'{command}' {}: {}", exit_label(.code), .stderr.trim())]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl ProcessError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProcessError::Timeout { .. })
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "terminated by signal".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum JjError {
    #[error("repositoryPath is required")]
    RepositoryPathRequired,

    #[error("no repository set - call set_repository first")]
    NoRepositorySet,

    #[error("repository not found at {}: {message}", .path.display())]
    RepositoryNotFound { path: PathBuf, message: String },

    #[error("current change has no description but has modified files; describe it first")]
    NoDescriptionOnCurrentChange,

    #[error(transparent)]
    Process(#[from] ProcessError),
}
