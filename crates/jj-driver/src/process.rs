use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::ProcessError;

// ─── Invocation ───────────────────────────────────────────────────────────

/// A fully described external command: program, arguments, working
/// directory and an optional deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Value following `flag` in the argument list, if present.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

// ─── Output ───────────────────────────────────────────────────────────────

/// Captured result of a finished process. `code` is `None` when the
/// process was killed by a signal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Output {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

// ─── CommandRunner ────────────────────────────────────────────────────────

/// The seam through which every subprocess is spawned.
///
/// Implementations return `Ok` for any process that ran to completion,
/// whatever its exit code; [`run_checked`] turns a non-zero exit into
/// [`ProcessError::Failed`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn output(&self, invocation: &Invocation) -> Result<Output, ProcessError>;
}

/// Run `invocation` and return its stdout, failing on a non-zero exit.
///
/// The error keeps the tool's stderr (or stdout, when stderr is empty) so
/// callers can surface the original message.
pub async fn run_checked<R>(runner: &R, invocation: &Invocation) -> Result<String, ProcessError>
where
    R: CommandRunner + ?Sized,
{
    let output = runner.output(invocation).await?;
    if output.success() {
        return Ok(output.stdout);
    }

    let stderr = if output.stderr.trim().is_empty() {
        output.stdout
    } else {
        output.stderr
    };
    Err(ProcessError::Failed {
        command: invocation.to_string(),
        code: output.code,
        stderr,
    })
}

// ─── TokioRunner ──────────────────────────────────────────────────────────

/// Spawns real processes with `tokio::process`.
///
/// Stdin is closed so a tool that unexpectedly prompts fails instead of
/// hanging. When the invocation carries a timeout the child is killed once
/// it elapses and [`ProcessError::Timeout`] is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

#[async_trait]
impl CommandRunner for TokioRunner {
    async fn output(&self, invocation: &Invocation) -> Result<Output, ProcessError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }

        tracing::debug!(command = %invocation, cwd = ?invocation.cwd, "spawning");

        let spawn_err = |source| ProcessError::Spawn {
            program: invocation.program.clone(),
            source,
        };
        let child = cmd.spawn().map_err(spawn_err)?;

        // Dropping the wait future on timeout kills the child (kill_on_drop).
        let waited = match invocation.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(command = %invocation, ?limit, "command timed out");
                    return Err(ProcessError::Timeout {
                        command: invocation.to_string(),
                        after: limit,
                    });
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| ProcessError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let result = Output {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(command = %invocation, code = ?result.code, "finished");
        Ok(result)
    }
}
