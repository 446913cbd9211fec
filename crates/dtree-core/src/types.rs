use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::DtreeError;

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Mutually exclusive; any status may move to any other through an
/// explicit update. Only `Closed` counts as done.
///
/// Statuses this crate does not model (`deferred`, `pinned`, ...) read as
/// `Other` and are treated like `Open`. `Other` cannot be written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Blocked,
    Closed,
    #[serde(other)]
    Other,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Closed => "closed",
            TaskStatus::Other => "other",
        }
    }

    /// Glyph shown in front of a task in a drawn tree.
    pub fn glyph(self) -> &'static str {
        match self {
            TaskStatus::Closed => "✓",
            TaskStatus::InProgress => "⚙",
            TaskStatus::Blocked => "⛔",
            TaskStatus::Open | TaskStatus::Other => "○",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = DtreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TaskStatus::Open),
            "in_progress" => Ok(TaskStatus::InProgress),
            "blocked" => Ok(TaskStatus::Blocked),
            "closed" => Ok(TaskStatus::Closed),
            _ => Err(DtreeError::InvalidResponse(format!("unknown task status: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Bug,
    Feature,
    #[default]
    Task,
    Epic,
    Chore,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Bug => "bug",
            TaskType::Feature => "feature",
            TaskType::Task => "task",
            TaskType::Epic => "epic",
            TaskType::Chore => "chore",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = DtreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bug" => Ok(TaskType::Bug),
            "feature" => Ok(TaskType::Feature),
            "task" => Ok(TaskType::Task),
            "epic" => Ok(TaskType::Epic),
            "chore" => Ok(TaskType::Chore),
            _ => Err(DtreeError::InvalidResponse(format!("unknown task type: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// DependencyType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyType {
    ParentChild,
    Blocks,
    Related,
    DiscoveredFrom,
}

impl DependencyType {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyType::ParentChild => "parent-child",
            DependencyType::Blocks => "blocks",
            DependencyType::Related => "related",
            DependencyType::DiscoveredFrom => "discovered-from",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DependencyType {
    type Err = DtreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent-child" => Ok(DependencyType::ParentChild),
            "blocks" => Ok(DependencyType::Blocks),
            "related" => Ok(DependencyType::Related),
            "discovered-from" => Ok(DependencyType::DiscoveredFrom),
            _ => Err(DtreeError::InvalidResponse(format!(
                "unknown dependency type: {s}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Task records (bd --json shapes)
// ---------------------------------------------------------------------------

/// A task as reported by `bd ... --json`. Ids are assigned by `bd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub status: TaskStatus,
    pub priority: u32,
    #[serde(rename = "issue_type")]
    pub task_type: TaskType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task reached through a dependency edge, tagged with the edge type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedTask {
    #[serde(flatten)]
    pub task: Task,
    pub dependency_type: DependencyType,
}

/// `bd show --json` element: the task plus both directions of its edges.
///
/// `dependencies` point from this task to what it depends on (its parent
/// for `parent-child`); `dependents` point back at tasks depending on it
/// (its children).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<LinkedTask>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependents: Vec<LinkedTask>,
}

impl TaskDetail {
    pub fn parents(&self) -> impl Iterator<Item = &LinkedTask> {
        self.dependencies
            .iter()
            .filter(|d| d.dependency_type == DependencyType::ParentChild)
    }

    pub fn children(&self) -> impl Iterator<Item = &LinkedTask> {
        self.dependents
            .iter()
            .filter(|d| d.dependency_type == DependencyType::ParentChild)
    }
}

/// Completion rollup of an epic's direct children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpicStatus {
    pub epic_id: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub in_progress_tasks: usize,
    pub blocked_tasks: usize,
    pub open_tasks: usize,
    pub completion_percentage: u32,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTask {
    pub title: String,
    pub task_type: Option<TaskType>,
    pub priority: Option<u32>,
    pub description: Option<String>,
}

impl CreateTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTask {
    pub task_id: String,
    pub status: Option<TaskStatus>,
    pub notes: Option<String>,
    pub description: Option<String>,
    pub title: Option<String>,
}

impl UpdateTask {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            ..Self::default()
        }
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.notes.is_none()
            && self.description.is_none()
            && self.title.is_none()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
