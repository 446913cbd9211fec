//! In-memory stand-in for the `bd` CLI, speaking its `--json` shapes.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use jj_driver::{CommandRunner, Invocation, Output, ProcessError};

use crate::types::{DependencyType, LinkedTask, Task, TaskDetail, TaskStatus, TaskType};

#[derive(Debug, Default)]
pub struct FakeBdState {
    pub workspace: PathBuf,
    pub tasks: Vec<Task>,
    /// `(task, depends_on, type)`; for parent-child the second id is the parent.
    pub edges: Vec<(String, String, DependencyType)>,
    pub invocations: Vec<Invocation>,
    pub hang_on_create: bool,
    pub show_returns_empty: bool,
    pub garbage_output: bool,
}

impl FakeBdState {
    fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn linked(&self, id: &str, dependency_type: DependencyType) -> Option<LinkedTask> {
        self.task(id).map(|task| LinkedTask {
            task: task.clone(),
            dependency_type,
        })
    }

    fn detail(&self, id: &str) -> Option<TaskDetail> {
        let task = self.task(id)?.clone();
        let dependencies = self
            .edges
            .iter()
            .filter(|(from, _, _)| from == id)
            .filter_map(|(_, to, ty)| self.linked(to, *ty))
            .collect();
        let dependents = self
            .edges
            .iter()
            .filter(|(_, to, _)| to == id)
            .filter_map(|(from, _, ty)| self.linked(from, *ty))
            .collect();
        Some(TaskDetail {
            task,
            dependencies,
            dependents,
        })
    }

    fn insert(&mut self, title: &str, task_type: TaskType, status: TaskStatus) -> &mut Task {
        let id = format!("bd-{}", self.tasks.len() + 1);
        self.tasks.push(Task {
            id,
            title: title.to_string(),
            description: String::new(),
            status,
            priority: 2,
            task_type,
            notes: String::new(),
            created_at: timestamp(),
            updated_at: timestamp(),
        });
        let last = self.tasks.len() - 1;
        &mut self.tasks[last]
    }

    fn is_ready(&self, task: &Task) -> bool {
        task.status == TaskStatus::Open
            && !self.edges.iter().any(|(from, to, ty)| {
                from == &task.id
                    && *ty == DependencyType::Blocks
                    && self
                        .task(to)
                        .is_some_and(|blocker| blocker.status != TaskStatus::Closed)
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeBd {
    state: Arc<Mutex<FakeBdState>>,
}

fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 20, 9, 0, 0).unwrap()
}

impl FakeBd {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        let state = FakeBdState {
            workspace: workspace.into(),
            ..FakeBdState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeBdState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a task directly, bypassing `bd create`.
    pub fn add(&self, title: &str, task_type: TaskType, status: TaskStatus) -> String {
        self.state().insert(title, task_type, status).id.clone()
    }

    /// Make `child` a parent-child dependent of `parent`.
    pub fn link(&self, child: &str, parent: &str) {
        self.state().edges.push((
            child.to_string(),
            parent.to_string(),
            DependencyType::ParentChild,
        ));
    }

    fn handle(&self, inv: &Invocation) -> Result<Output, ProcessError> {
        let mut state = self.state();
        state.invocations.push(inv.clone());

        if inv.cwd.as_ref() != Some(&state.workspace) {
            return Ok(Output::failure(1, "Error: no beads database found"));
        }
        if state.garbage_output {
            return Ok(Output::ok("Warning: daemon not running\n"));
        }

        let args: Vec<&str> = inv.args.iter().map(String::as_str).collect();
        let id = args.get(1).copied().unwrap_or_default().to_string();

        let out = match args.first().copied() {
            Some("create") => {
                if state.hang_on_create {
                    return Err(ProcessError::Timeout {
                        command: inv.to_string(),
                        after: inv.timeout.unwrap_or_default(),
                    });
                }
                let task_type = inv
                    .flag_value("-t")
                    .and_then(|t| t.parse().ok())
                    .unwrap_or_default();
                let priority = inv
                    .flag_value("-p")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(2);
                let description = inv.flag_value("-d").unwrap_or_default().to_string();
                let title = match args.iter().position(|a| *a == "--") {
                    Some(i) => args.get(i + 1).copied().unwrap_or_default(),
                    None => args.get(1).copied().unwrap_or_default(),
                };
                if title.is_empty() || (!args.contains(&"--") && title.starts_with('-')) {
                    return Ok(Output::failure(1, format!("Error: unknown shorthand flag in {title:?}")));
                }
                let task = state.insert(title, task_type, TaskStatus::Open);
                task.priority = priority;
                task.description = description;
                Output::ok(serde_json::to_string(&*task).unwrap())
            }
            Some("show") => {
                if state.show_returns_empty {
                    return Ok(Output::ok("[]"));
                }
                match state.detail(&id) {
                    Some(detail) => Output::ok(serde_json::to_string(&[detail]).unwrap()),
                    None => Output::failure(1, format!("Error: no issue found matching '{id}'")),
                }
            }
            Some("update") => {
                let status = inv.flag_value("--status").and_then(|s| s.parse().ok());
                let notes = inv.flag_value("--notes").map(str::to_owned);
                let description = inv.flag_value("--description").map(str::to_owned);
                let title = inv.flag_value("--title").map(str::to_owned);
                let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
                    return Ok(Output::failure(1, format!("Error: issue {id} not found")));
                };
                if let Some(status) = status {
                    task.status = status;
                }
                if let Some(notes) = notes {
                    task.notes = notes;
                }
                if let Some(description) = description {
                    task.description = description;
                }
                if let Some(title) = title {
                    task.title = title;
                }
                Output::ok(format!("✓ Updated issue: {id}\n"))
            }
            Some("close") => {
                let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
                    return Ok(Output::failure(1, format!("Error: issue {id} not found")));
                };
                task.status = TaskStatus::Closed;
                Output::ok(format!("✓ Closed {id}\n"))
            }
            Some("ready") => {
                let limit = inv
                    .flag_value("--limit")
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(usize::MAX);
                let ready: Vec<&Task> = state
                    .tasks
                    .iter()
                    .filter(|t| state.is_ready(t))
                    .take(limit)
                    .collect();
                Output::ok(serde_json::to_string(&ready).unwrap())
            }
            Some("dep") if args.get(1) == Some(&"add") => {
                let (Some(from), Some(to)) = (args.get(2), args.get(3)) else {
                    return Ok(Output::failure(2, "Error: dep add requires two ids"));
                };
                let Some(ty) = inv.flag_value("--type").and_then(|t| t.parse().ok()) else {
                    return Ok(Output::failure(2, "Error: invalid dependency type"));
                };
                let (from, to) = (from.to_string(), to.to_string());
                state.edges.push((from.clone(), to.clone(), ty));
                Output::ok(format!("✓ Added dependency: {from} depends on {to}\n"))
            }
            other => Output::failure(2, format!("Error: unknown command {other:?}")),
        };
        Ok(out)
    }
}

#[async_trait]
impl CommandRunner for FakeBd {
    async fn output(&self, invocation: &Invocation) -> Result<Output, ProcessError> {
        self.handle(invocation)
    }
}
