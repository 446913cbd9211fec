use std::path::{Path, PathBuf};

use crate::error::JjError;
use crate::process::{run_checked, CommandRunner, Invocation, TokioRunner};
use crate::types::{
    parse_changed_files, parse_log, LogEntry, RepositoryStatus, ShowResult, StartTaskResult,
    WorkflowContext, LOG_TEMPLATE,
};
use crate::Result;

/// Default number of entries returned by [`JjWorkflow::log`].
pub const DEFAULT_LOG_LIMIT: usize = 10;

/// Start / checkpoint / finish conventions on top of the `jj` change graph.
///
/// The repository is held by this value rather than by the process, so two
/// workflows can drive two repositories side by side. Operations other than
/// [`set_repository`](Self::set_repository) and [`cleanup`](Self::cleanup)
/// fail with [`JjError::NoRepositorySet`] until a repository is set.
///
/// Multi-step operations are not transactional: if a step fails, the
/// repository keeps whatever the completed steps produced.
#[derive(Debug)]
pub struct JjWorkflow<R = TokioRunner> {
    runner: R,
    binary: String,
    repository: Option<PathBuf>,
}

impl JjWorkflow<TokioRunner> {
    pub fn new() -> Self {
        Self::with_runner(TokioRunner)
    }
}

impl Default for JjWorkflow<TokioRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> JjWorkflow<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            binary: "jj".to_string(),
            repository: None,
        }
    }

    /// Use a different `jj` executable (absolute path or name on `PATH`).
    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn repository(&self) -> Option<&Path> {
        self.repository.as_deref()
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    // -----------------------------------------------------------------------
    // Repository context
    // -----------------------------------------------------------------------

    /// Validate `path` as a jj repository and make it the active one.
    ///
    /// Any CLI failure (missing path, not a repository, `jj` not installed)
    /// becomes [`JjError::RepositoryNotFound`] carrying the original message.
    /// On failure the previously active repository, if any, is kept.
    pub async fn set_repository(&mut self, path: impl AsRef<Path>) -> Result<RepositoryStatus> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(JjError::RepositoryPathRequired);
        }

        let not_found = |e: JjError| JjError::RepositoryNotFound {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let current_change_id = self.change_id(path, "@").await.map_err(not_found)?;
        let changed_files = self.status_files(path).await.map_err(not_found)?;

        tracing::debug!(repository = %path.display(), %current_change_id, "repository set");
        self.repository = Some(path.to_path_buf());

        Ok(RepositoryStatus {
            current_change_id,
            changed_files,
        })
    }

    /// Forget the active repository.
    pub fn cleanup(&mut self) {
        self.repository = None;
    }

    pub async fn context(&self) -> Result<WorkflowContext> {
        let repo = self.repo()?;
        Ok(WorkflowContext {
            current_change_id: self.change_id(repo, "@").await?,
            description: self.description(repo, "@").await?,
        })
    }

    pub async fn changed_files(&self) -> Result<Vec<String>> {
        let repo = self.repo()?;
        self.status_files(repo).await
    }

    // -----------------------------------------------------------------------
    // Task lifecycle
    // -----------------------------------------------------------------------

    /// Begin a task described by `description`.
    ///
    /// - current change described: `new`, describe the new change, `new`
    ///   again, leaving `described → empty working copy` on top of it.
    /// - current change undescribed and clean: describe it in place, `new`.
    /// - current change undescribed with modified files: refuse with
    ///   [`JjError::NoDescriptionOnCurrentChange`] instead of folding the
    ///   unrelated work into the task.
    pub async fn start_task(&self, description: &str) -> Result<StartTaskResult> {
        let repo = self.repo()?;

        let current_description = self.description(repo, "@").await?;
        let was_empty = self.status_files(repo).await?.is_empty();

        if current_description.is_empty() {
            if !was_empty {
                return Err(JjError::NoDescriptionOnCurrentChange);
            }
            self.describe_revision(repo, "@", description).await?;
            self.new_change(repo).await?;
        } else {
            self.new_change(repo).await?;
            self.describe_revision(repo, "@", description).await?;
            self.new_change(repo).await?;
        }

        let change_id = self.change_id(repo, "@").await?;
        tracing::info!(%change_id, was_empty, "task started");
        Ok(StartTaskResult {
            change_id,
            was_empty,
        })
    }

    /// Append `summary` as a bullet to the task description (`@-`) and
    /// squash the working copy into it.
    pub async fn checkpoint(&self, summary: &str) -> Result<()> {
        let repo = self.repo()?;

        let parent_description = self.description(repo, "@-").await?;
        let updated = format!("{parent_description}\n- {summary}");
        self.describe_revision(repo, "@-", &updated).await?;

        // An explicit message keeps squash from opening an editor.
        self.jj(repo, ["squash".to_string(), format!("--message={updated}")])
            .await?;

        // jj abandons the emptied working copy and checks out a fresh child
        // of the parent. If the checkout landed on the described change
        // itself instead, put an empty working copy back on top.
        if !self.description(repo, "@").await?.is_empty() {
            tracing::debug!("squash left the described change checked out; creating working copy");
            self.new_change(repo).await?;
        }

        tracing::info!(summary, "checkpoint recorded");
        Ok(())
    }

    /// Leave the task: check out the described change and start a fresh
    /// empty working copy on top of it. The old, empty working copy is
    /// abandoned by jj when the checkout moves away from it.
    pub async fn finish_task(&self) -> Result<()> {
        let repo = self.repo()?;
        self.jj(repo, ["edit", "@-"]).await?;
        self.new_change(repo).await?;
        tracing::info!("task finished");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Pass-throughs
    // -----------------------------------------------------------------------

    /// Set the description of the current change.
    pub async fn describe(&self, description: &str) -> Result<()> {
        let repo = self.repo()?;
        self.describe_revision(repo, "@", description).await
    }

    /// Up to `limit` (default [`DEFAULT_LOG_LIMIT`]) changes walking back
    /// from `@`, most recent first.
    pub async fn log(&self, limit: Option<usize>) -> Result<Vec<LogEntry>> {
        let repo = self.repo()?;
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT);

        let text = self
            .jj(
                repo,
                [
                    "log".to_string(),
                    "-r".to_string(),
                    "::@".to_string(),
                    "-n".to_string(),
                    limit.to_string(),
                    "--no-graph".to_string(),
                    "-T".to_string(),
                    LOG_TEMPLATE.to_string(),
                ],
            )
            .await?;

        Ok(parse_log(&text))
    }

    /// Id, description and diff of `revision` (default `@`).
    pub async fn show(&self, revision: Option<&str>) -> Result<ShowResult> {
        let repo = self.repo()?;
        let revision = revision.unwrap_or("@");

        Ok(ShowResult {
            change_id: self.change_id(repo, revision).await?,
            description: self.description(repo, revision).await?,
            diff: self.jj(repo, ["diff", "-r", revision]).await?,
        })
    }

    /// Create bookmark `name` at the current change.
    pub async fn create_bookmark(&self, name: &str) -> Result<()> {
        let repo = self.repo()?;
        // `--` keeps a name with a leading dash from parsing as a flag.
        self.jj(repo, ["bookmark", "create", "-r", "@", "--", name])
            .await?;
        tracing::info!(bookmark = name, "bookmark created");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // CLI helpers
    // -----------------------------------------------------------------------

    fn repo(&self) -> Result<&Path> {
        self.repository.as_deref().ok_or(JjError::NoRepositorySet)
    }

    async fn jj<I, S>(&self, repo: &Path, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // Global flags go first so a trailing `--` only guards operands.
        let invocation = Invocation::new(&self.binary)
            .arg("--repository")
            .arg(repo.to_string_lossy())
            .args(args);
        Ok(run_checked(&self.runner, &invocation).await?)
    }

    async fn change_id(&self, repo: &Path, revision: &str) -> Result<String> {
        let out = self
            .jj(repo, ["log", "-r", revision, "--no-graph", "-T", "change_id"])
            .await?;
        Ok(out.trim().to_string())
    }

    async fn description(&self, repo: &Path, revision: &str) -> Result<String> {
        let out = self
            .jj(repo, ["log", "-r", revision, "--no-graph", "-T", "description"])
            .await?;
        Ok(out.trim().to_string())
    }

    async fn status_files(&self, repo: &Path) -> Result<Vec<String>> {
        let out = self.jj(repo, ["status"]).await?;
        Ok(parse_changed_files(&out))
    }

    async fn describe_revision(&self, repo: &Path, revision: &str, text: &str) -> Result<()> {
        self.jj(
            repo,
            [
                "describe".to_string(),
                revision.to_string(),
                format!("--message={text}"),
            ],
        )
        .await?;
        Ok(())
    }

    async fn new_change(&self, repo: &Path) -> Result<()> {
        self.jj(repo, ["new"]).await?;
        Ok(())
    }
}
