//! Multi-tool sequences: jj change lifecycle plus bd task status.
//!
//! Steps run in order and stop at the first failure; completed steps are
//! not undone.

use std::path::PathBuf;

use jj_driver::{CommandRunner, JjWorkflow, StartTaskResult};

use crate::beads::Beads;
use crate::error::Result;
use crate::shortcut::{Shortcut, ShortcutStory};
use crate::types::{TaskStatus, UpdateTask};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateJjBookmark {
    pub branch_name: String,
    pub repository_path: PathBuf,
    pub description: Option<String>,
}

/// Point `jj` at the repository, bookmark the current change and, when a
/// description is given, describe it.
pub async fn create_jj_bookmark<R: CommandRunner>(
    jj: &mut JjWorkflow<R>,
    input: &CreateJjBookmark,
) -> Result<()> {
    jj.set_repository(&input.repository_path).await?;
    jj.create_bookmark(&input.branch_name).await?;
    if let Some(description) = input.description.as_deref().filter(|d| !d.is_empty()) {
        jj.describe(description).await?;
    }
    Ok(())
}

/// Start a jj task before any files change, then claim the bd task.
pub async fn start<J, B>(
    jj: &JjWorkflow<J>,
    beads: &Beads<B>,
    task_id: &str,
    description: &str,
) -> Result<StartTaskResult>
where
    J: CommandRunner,
    B: CommandRunner,
{
    let started = jj.start_task(description).await?;
    beads
        .update_task(&UpdateTask::new(task_id).status(TaskStatus::InProgress))
        .await?;
    tracing::info!(task_id, change_id = %started.change_id, "task claimed");
    Ok(started)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinishTask {
    pub task_id: String,
    pub summary: String,
    pub reason: Option<String>,
    /// Epic whose notes record the completed work.
    pub epic_id: Option<String>,
    /// Defaults to a line naming the task and its summary.
    pub epic_notes: Option<String>,
}

/// Checkpoint the work, close the task, note it on the epic, then leave
/// a fresh working copy.
pub async fn finish<J, B>(jj: &JjWorkflow<J>, beads: &Beads<B>, input: &FinishTask) -> Result<()>
where
    J: CommandRunner,
    B: CommandRunner,
{
    jj.checkpoint(&input.summary).await?;
    beads
        .close_task(&input.task_id, input.reason.as_deref())
        .await?;

    if let Some(epic_id) = &input.epic_id {
        let notes = input
            .epic_notes
            .clone()
            .unwrap_or_else(|| format!("Completed {}: {}", input.task_id, input.summary));
        beads.append_notes(epic_id, &notes).await?;
    }

    jj.finish_task().await?;
    tracing::info!(task_id = %input.task_id, "task finished");
    Ok(())
}

/// Fetch a Shortcut story and bookmark the current change with its branch
/// name.
pub async fn bookmark_story<R: CommandRunner>(
    jj: &mut JjWorkflow<R>,
    shortcut: &Shortcut,
    story_id: u64,
    repository_path: impl Into<PathBuf>,
) -> Result<ShortcutStory> {
    let story = shortcut.story(story_id).await?;
    create_jj_bookmark(
        jj,
        &CreateJjBookmark {
            branch_name: story.branch_name.clone(),
            repository_path: repository_path.into(),
            description: None,
        },
    )
    .await?;
    Ok(story)
}
