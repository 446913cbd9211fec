use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use jj_driver::{CommandRunner, Invocation, ProcessError, TokioRunner};
use serde::de::DeserializeOwned;

use crate::error::{DtreeError, Result};
use crate::tree::TaskSource;
use crate::types::{CreateTask, DependencyType, Task, TaskDetail, TaskStatus, UpdateTask};

pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_PRIORITY: u32 = 2;

/// Wrapper over the `bd` issue-tracker CLI, bound to one workspace.
///
/// Every command runs with the workspace as its working directory; `bd`
/// finds its database from there.
#[derive(Debug)]
pub struct Beads<R = TokioRunner> {
    runner: R,
    binary: String,
    workspace: PathBuf,
    create_timeout: Duration,
    default_priority: u32,
}

impl Beads<TokioRunner> {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self::with_runner(TokioRunner, workspace)
    }
}

impl<R: CommandRunner> Beads<R> {
    pub fn with_runner(runner: R, workspace: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            binary: "bd".to_string(),
            workspace: workspace.into(),
            create_timeout: DEFAULT_CREATE_TIMEOUT,
            default_priority: DEFAULT_PRIORITY,
        }
    }

    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn create_timeout(mut self, limit: Duration) -> Self {
        self.create_timeout = limit;
        self
    }

    pub fn default_priority(mut self, priority: u32) -> Self {
        self.default_priority = priority;
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// `bd create`. Type defaults to `task`, priority to the configured
    /// default. Outside a git repository `bd` hangs; the call is killed
    /// after the create timeout and reported as [`DtreeError::BdTimeout`].
    pub async fn create_task(&self, input: &CreateTask) -> Result<Task> {
        let task_type = input.task_type.unwrap_or_default();
        let priority = input.priority.unwrap_or(self.default_priority);

        let mut args = vec![
            "create".to_string(),
            "-t".to_string(),
            task_type.to_string(),
            "-p".to_string(),
            priority.to_string(),
        ];
        if let Some(description) = &input.description {
            args.push("-d".to_string());
            args.push(description.clone());
        }
        args.push("--json".to_string());
        // The title goes last, behind `--`, so `-fix tests` stays a title.
        args.push("--".to_string());
        args.push(input.title.clone());

        let invocation = self.invocation(args).timeout(self.create_timeout);
        let out = jj_driver::process::run_checked(&self.runner, &invocation)
            .await
            .map_err(|e| match e {
                ProcessError::Timeout { .. } => DtreeError::BdTimeout,
                other => other.into(),
            })?;

        let task: Task = parse(&out, "create")?;
        tracing::info!(task_id = %task.id, title = %task.title, "task created");
        Ok(task)
    }

    /// `bd show --json`: the task with both directions of its edges.
    pub async fn show_task(&self, task_id: &str) -> Result<TaskDetail> {
        let out = self.bd(["show", task_id, "--json"]).await?;
        let details: Vec<TaskDetail> = parse(&out, "show")?;
        details
            .into_iter()
            .next()
            .ok_or_else(|| DtreeError::TaskNotFound(task_id.to_string()))
    }

    /// Apply the fields set on `input`. Nothing is run when none are.
    pub async fn update_task(&self, input: &UpdateTask) -> Result<()> {
        if input.is_empty() {
            tracing::debug!(task_id = %input.task_id, "update with no fields; skipping");
            return Ok(());
        }

        if input.status == Some(TaskStatus::Other) {
            return Err(DtreeError::InvalidParams {
                tool: "bd update".to_string(),
                reason: "status `other` stands for statuses bd reported and cannot be set"
                    .to_string(),
            });
        }

        let mut args = vec!["update".to_string(), input.task_id.clone()];
        if let Some(status) = input.status {
            args.push("--status".to_string());
            args.push(status.to_string());
        }
        for (flag, value) in [
            ("--notes", &input.notes),
            ("--description", &input.description),
            ("--title", &input.title),
        ] {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }

        self.bd(args).await?;
        Ok(())
    }

    pub async fn close_task(&self, task_id: &str, reason: Option<&str>) -> Result<()> {
        let mut args = vec!["close".to_string(), task_id.to_string()];
        if let Some(reason) = reason {
            args.push("--reason".to_string());
            args.push(reason.to_string());
        }
        self.bd(args).await?;
        tracing::info!(task_id, "task closed");
        Ok(())
    }

    /// Tasks with no open blockers, in `bd`'s order.
    pub async fn find_ready_tasks(&self, limit: Option<usize>) -> Result<Vec<Task>> {
        let mut args = vec!["ready".to_string(), "--json".to_string()];
        if let Some(limit) = limit {
            args.push("--limit".to_string());
            args.push(limit.to_string());
        }
        let out = self.bd(args).await?;
        parse(&out, "ready")
    }

    /// Record that `task_id` depends on `depends_on_id`. For
    /// [`DependencyType::ParentChild`] the second task is the parent.
    pub async fn add_dependency(
        &self,
        task_id: &str,
        depends_on_id: &str,
        dependency_type: DependencyType,
    ) -> Result<()> {
        self.bd([
            "dep",
            "add",
            task_id,
            depends_on_id,
            "--type",
            dependency_type.as_str(),
        ])
        .await?;
        Ok(())
    }

    /// Add `notes` on a new line after the task's existing notes.
    ///
    /// Read-then-write: a concurrent writer between the two calls loses.
    pub async fn append_notes(&self, task_id: &str, notes: &str) -> Result<()> {
        let current = self.show_task(task_id).await?.task.notes;
        let combined = if current.trim().is_empty() {
            notes.to_string()
        } else {
            format!("{}\n{notes}", current.trim_end())
        };
        self.update_task(&UpdateTask::new(task_id).notes(combined))
            .await
    }

    // -----------------------------------------------------------------------
    // CLI helpers
    // -----------------------------------------------------------------------

    fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(&self.binary)
            .args(args)
            .current_dir(&self.workspace)
    }

    async fn bd<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocation = self.invocation(args);
        Ok(jj_driver::process::run_checked(&self.runner, &invocation).await?)
    }
}

#[async_trait]
impl<R: CommandRunner> TaskSource for Beads<R> {
    async fn show_task(&self, task_id: &str) -> Result<TaskDetail> {
        Beads::show_task(self, task_id).await
    }
}

fn parse<T: DeserializeOwned>(text: &str, command: &str) -> Result<T> {
    serde_json::from_str(text.trim()).map_err(|e| {
        DtreeError::InvalidResponse(format!("unexpected output from bd {command}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBd;
    use crate::types::{TaskStatus, TaskType};

    const WORKSPACE: &str = "/work/skills";

    fn beads() -> (Beads<FakeBd>, FakeBd) {
        let fake = FakeBd::new(WORKSPACE);
        (Beads::with_runner(fake.clone(), WORKSPACE), fake)
    }

    #[tokio::test]
    async fn create_then_show_round_trips() {
        let (bd, _fake) = beads();
        let created = bd
            .create_task(&CreateTask {
                title: "Implement showTask".to_string(),
                task_type: Some(TaskType::Feature),
                priority: Some(1),
                description: Some("via bd show --json".to_string()),
            })
            .await
            .unwrap();

        let shown = bd.show_task(&created.id).await.unwrap().task;
        assert_eq!(shown.id, created.id);
        assert_eq!(shown.title, "Implement showTask");
        assert_eq!(shown.status, TaskStatus::Open);
        assert_eq!(shown.priority, 1);
        assert_eq!(shown.task_type, TaskType::Feature);
        assert_eq!(shown.description, "via bd show --json");
    }

    #[tokio::test]
    async fn create_applies_defaults_and_runs_in_workspace() {
        let (bd, fake) = beads();
        bd.create_task(&CreateTask::new("Defaults")).await.unwrap();

        let state = fake.state();
        let call = state.invocations.last().unwrap();
        assert_eq!(
            call.args,
            ["create", "-t", "task", "-p", "2", "--json", "--", "Defaults"]
        );
        assert_eq!(call.cwd.as_deref(), Some(Path::new(WORKSPACE)));
        assert_eq!(call.timeout, Some(DEFAULT_CREATE_TIMEOUT));
    }

    #[tokio::test]
    async fn create_title_with_leading_dash_is_not_a_flag() {
        let (bd, _fake) = beads();
        let created = bd.create_task(&CreateTask::new("-fix tests")).await.unwrap();
        assert_eq!(created.title, "-fix tests");
        assert_eq!(created.task_type, TaskType::Task);
    }

    #[tokio::test]
    async fn other_status_is_not_written_back() {
        let (bd, fake) = beads();
        let id = fake.add("Deferred", TaskType::Task, TaskStatus::Open);
        let before = fake.state().invocations.len();

        let err = bd
            .update_task(&UpdateTask::new(&id).status(TaskStatus::Other))
            .await
            .unwrap_err();
        assert!(matches!(err, DtreeError::InvalidParams { .. }), "{err:?}");
        assert_eq!(fake.state().invocations.len(), before);
    }

    #[tokio::test]
    async fn create_timeout_is_reported_as_bd_timeout() {
        let (bd, fake) = beads();
        fake.state().hang_on_create = true;

        let err = bd.create_task(&CreateTask::new("hangs")).await.unwrap_err();
        assert!(matches!(err, DtreeError::BdTimeout));
        assert_eq!(
            err.to_string(),
            "bd operation timed out - workspace may not be a git repository"
        );
    }

    #[tokio::test]
    async fn show_empty_array_is_not_found() {
        let (bd, fake) = beads();
        fake.state().show_returns_empty = true;
        let err = bd.show_task("bd-404").await.unwrap_err();
        assert!(matches!(err, DtreeError::TaskNotFound(ref id) if id == "bd-404"));
    }

    #[tokio::test]
    async fn show_failure_keeps_cli_message() {
        let (bd, _fake) = beads();
        let err = bd.show_task("bd-missing").await.unwrap_err();
        assert!(matches!(err, DtreeError::Process(_)));
        assert!(err.to_string().contains("no issue found"), "{err}");
    }

    #[tokio::test]
    async fn garbage_output_is_invalid_response() {
        let (bd, fake) = beads();
        fake.state().garbage_output = true;
        let err = bd.find_ready_tasks(None).await.unwrap_err();
        assert!(matches!(err, DtreeError::InvalidResponse(_)), "{err:?}");
    }

    #[tokio::test]
    async fn update_sends_only_given_fields() {
        let (bd, fake) = beads();
        let task = bd.create_task(&CreateTask::new("t")).await.unwrap();

        bd.update_task(&UpdateTask::new(&task.id).status(TaskStatus::InProgress))
            .await
            .unwrap();

        let state = fake.state();
        let call = state.invocations.last().unwrap();
        assert_eq!(call.args, ["update", task.id.as_str(), "--status", "in_progress"]);
        assert_eq!(state.tasks[0].status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn empty_update_runs_nothing() {
        let (bd, fake) = beads();
        bd.update_task(&UpdateTask::new("bd-1")).await.unwrap();
        assert!(fake.state().invocations.is_empty());
    }

    #[tokio::test]
    async fn close_with_and_without_reason() {
        let (bd, fake) = beads();
        let a = bd.create_task(&CreateTask::new("a")).await.unwrap();
        let b = bd.create_task(&CreateTask::new("b")).await.unwrap();

        bd.close_task(&a.id, Some("done")).await.unwrap();
        bd.close_task(&b.id, None).await.unwrap();

        let state = fake.state();
        let n = state.invocations.len();
        assert_eq!(state.invocations[n - 2].args, ["close", a.id.as_str(), "--reason", "done"]);
        assert_eq!(state.invocations[n - 1].args, ["close", b.id.as_str()]);
        assert!(state.tasks.iter().all(|t| t.status == TaskStatus::Closed));
    }

    #[tokio::test]
    async fn ready_excludes_blocked_and_closed() {
        let (bd, _fake) = beads();
        let blocker = bd.create_task(&CreateTask::new("blocker")).await.unwrap();
        let blocked = bd.create_task(&CreateTask::new("blocked")).await.unwrap();
        let done = bd.create_task(&CreateTask::new("done")).await.unwrap();
        bd.add_dependency(&blocked.id, &blocker.id, DependencyType::Blocks)
            .await
            .unwrap();
        bd.close_task(&done.id, None).await.unwrap();

        let ready: Vec<String> = bd
            .find_ready_tasks(None)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ready, [blocker.id.clone()]);

        bd.close_task(&blocker.id, None).await.unwrap();
        let ready = bd.find_ready_tasks(Some(1)).await.unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, blocked.id);
    }

    #[tokio::test]
    async fn add_dependency_links_both_directions() {
        let (bd, _fake) = beads();
        let epic = bd
            .create_task(&CreateTask {
                task_type: Some(TaskType::Epic),
                ..CreateTask::new("epic")
            })
            .await
            .unwrap();
        let child = bd.create_task(&CreateTask::new("child")).await.unwrap();
        bd.add_dependency(&child.id, &epic.id, DependencyType::ParentChild)
            .await
            .unwrap();

        let child_detail = bd.show_task(&child.id).await.unwrap();
        let epic_detail = bd.show_task(&epic.id).await.unwrap();
        assert_eq!(child_detail.parents().next().unwrap().task.id, epic.id);
        assert_eq!(epic_detail.children().next().unwrap().task.id, child.id);
    }

    #[tokio::test]
    async fn append_notes_adds_a_line() {
        let (bd, _fake) = beads();
        let task = bd.create_task(&CreateTask::new("epic")).await.unwrap();

        bd.append_notes(&task.id, "first").await.unwrap();
        bd.append_notes(&task.id, "second").await.unwrap();

        let notes = bd.show_task(&task.id).await.unwrap().task.notes;
        assert_eq!(notes, "first\nsecond");
    }
}
