//! Walks over parent-child links between tasks.
//!
//! Everything here reads tasks through [`TaskSource`], one `show` per
//! visited node, strictly in sequence. Any cycle among parent-child links
//! fails the walk with [`DtreeError::CycleDetected`] instead of recursing
//! forever.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::{DtreeError, Result};
use crate::types::{EpicStatus, Task, TaskDetail, TaskStatus};

/// Leading line of a drawn tree, addressed to the agent that asked for it.
pub const DRAW_TREE_INSTRUCTION: &str =
    "IMPORTANT: Display the tree below to the user exactly as shown.";

const BRANCH: &str = "⎿";
const INDENT: &str = "  ";

/// Anything that can fetch a task together with its edges.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn show_task(&self, task_id: &str) -> Result<TaskDetail>;
}

/// Ancestor chain `[task, parent, grandparent, ...]` up to the root.
///
/// Each step follows the first parent-child dependency in tracker order.
pub async fn dependency_tree<S>(source: &S, task_id: &str) -> Result<Vec<Task>>
where
    S: TaskSource + ?Sized,
{
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(task_id.to_string());

    while let Some(id) = next.take() {
        if !seen.insert(id.clone()) {
            return Err(DtreeError::CycleDetected(id));
        }
        let detail = source.show_task(&id).await?;

        let (parent, several) = {
            let mut parents = detail.parents();
            (parents.next().map(|p| p.task.id.clone()), parents.next().is_some())
        };
        next = parent;
        if several {
            tracing::warn!(
                task_id = %detail.task.id,
                followed = ?next,
                "task has more than one parent; following the first"
            );
        }
        chain.push(detail.task);
    }

    Ok(chain)
}

/// Render the task and all its parent-child descendants top-down.
///
/// ```text
/// <instruction>
///
/// ○ Epic
/// ⎿ ⚙ Task
///   ⎿ ✓ Subtask
/// ```
pub async fn draw_tree<S>(source: &S, task_id: &str) -> Result<String>
where
    S: TaskSource + ?Sized,
{
    struct Pending {
        id: String,
        depth: usize,
        // Ids from the root down to this node's parent.
        path: Vec<String>,
    }

    let mut lines = Vec::new();
    let mut stack = vec![Pending {
        id: task_id.to_string(),
        depth: 0,
        path: Vec::new(),
    }];

    while let Some(node) = stack.pop() {
        if node.path.contains(&node.id) {
            return Err(DtreeError::CycleDetected(node.id));
        }
        let detail = source.show_task(&node.id).await?;
        lines.push(render_line(&detail.task, node.depth));

        let mut path = node.path;
        path.push(node.id);
        // Reverse so the first child is popped first.
        let children: Vec<String> = detail.children().map(|c| c.task.id.clone()).collect();
        for child in children.into_iter().rev() {
            stack.push(Pending {
                id: child,
                depth: node.depth + 1,
                path: path.clone(),
            });
        }
    }

    Ok(format!("{DRAW_TREE_INSTRUCTION}\n\n{}", lines.join("\n")))
}

fn render_line(task: &Task, depth: usize) -> String {
    let label = format!("{} {}", task.status.glyph(), task.title);
    match depth {
        0 => label,
        d => format!("{}{BRANCH} {label}", INDENT.repeat(d - 1)),
    }
}

/// Counts of the epic's direct parent-child children by status.
pub async fn epic_status<S>(source: &S, epic_id: &str) -> Result<EpicStatus>
where
    S: TaskSource + ?Sized,
{
    let detail = source.show_task(epic_id).await?;

    let mut status = EpicStatus {
        epic_id: epic_id.to_string(),
        total_tasks: 0,
        completed_tasks: 0,
        in_progress_tasks: 0,
        blocked_tasks: 0,
        open_tasks: 0,
        completion_percentage: 0,
    };
    for child in detail.children() {
        match child.task.status {
            TaskStatus::Closed => status.completed_tasks += 1,
            TaskStatus::InProgress => status.in_progress_tasks += 1,
            TaskStatus::Blocked => status.blocked_tasks += 1,
            TaskStatus::Open | TaskStatus::Other => status.open_tasks += 1,
        }
        status.total_tasks += 1;
    }
    status.completion_percentage = percentage(status.completed_tasks, status.total_tasks);
    Ok(status)
}

/// `round(100 * part / whole)` with halves rounded up; 0 for an empty whole.
fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let rounded = (200 * part + whole) / (2 * whole);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beads::Beads;
    use crate::testing::FakeBd;
    use crate::types::TaskType;

    const WORKSPACE: &str = "/work/skills";

    fn beads() -> (Beads<FakeBd>, FakeBd) {
        let fake = FakeBd::new(WORKSPACE);
        (Beads::with_runner(fake.clone(), WORKSPACE), fake)
    }

    fn draw(body: &str) -> String {
        format!("{DRAW_TREE_INSTRUCTION}\n\n{body}")
    }

    /// Answers every lookup with `bd show` JSON for `id`, from a fixed map.
    struct RawShow(Vec<(&'static str, serde_json::Value)>);

    #[async_trait]
    impl TaskSource for RawShow {
        async fn show_task(&self, task_id: &str) -> Result<TaskDetail> {
            let (_, json) = self
                .0
                .iter()
                .find(|(id, _)| *id == task_id)
                .ok_or_else(|| DtreeError::TaskNotFound(task_id.to_string()))?;
            Ok(serde_json::from_value(json.clone())?)
        }
    }

    fn raw_task(id: &str, title: &str, status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": title,
            "status": status,
            "priority": 2,
            "issue_type": "task",
            "created_at": "2025-10-20T09:00:00Z",
            "updated_at": "2025-10-20T09:00:00Z",
        })
    }

    fn with_edges(
        mut task: serde_json::Value,
        dependencies: Vec<serde_json::Value>,
        dependents: Vec<serde_json::Value>,
    ) -> serde_json::Value {
        let linked = |mut t: serde_json::Value| {
            t["dependency_type"] = "parent-child".into();
            t
        };
        task["dependencies"] = dependencies.into_iter().map(linked).collect();
        task["dependents"] = dependents.into_iter().map(linked).collect();
        task
    }

    // -- dependency_tree ----------------------------------------------------

    #[tokio::test]
    async fn standalone_task_is_its_own_chain() {
        let (bd, fake) = beads();
        let id = fake.add("Lonely", TaskType::Task, TaskStatus::Open);

        let chain = dependency_tree(&bd, &id).await.unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0], bd.show_task(&id).await.unwrap().task);
    }

    #[tokio::test]
    async fn chain_climbs_to_the_root() {
        let (bd, fake) = beads();
        let epic = fake.add("Epic", TaskType::Epic, TaskStatus::Open);
        let task = fake.add("Task", TaskType::Task, TaskStatus::Open);
        let sub = fake.add("Subtask", TaskType::Task, TaskStatus::Open);
        fake.link(&task, &epic);
        fake.link(&sub, &task);

        let ids: Vec<String> = dependency_tree(&bd, &sub)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, [sub, task, epic]);
    }

    #[tokio::test]
    async fn chain_ignores_non_parent_edges() {
        let (bd, fake) = beads();
        let other = fake.add("Other", TaskType::Task, TaskStatus::Open);
        let task = fake.add("Task", TaskType::Task, TaskStatus::Open);
        bd.add_dependency(&task, &other, crate::types::DependencyType::Blocks)
            .await
            .unwrap();

        assert_eq!(dependency_tree(&bd, &task).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn chain_cycle_is_detected() {
        let (bd, fake) = beads();
        let a = fake.add("A", TaskType::Task, TaskStatus::Open);
        let b = fake.add("B", TaskType::Task, TaskStatus::Open);
        fake.link(&a, &b);
        fake.link(&b, &a);

        let err = dependency_tree(&bd, &a).await.unwrap_err();
        assert!(matches!(err, DtreeError::CycleDetected(ref id) if *id == a), "{err:?}");
    }

    #[tokio::test]
    async fn chain_fetch_failure_propagates() {
        let (bd, _fake) = beads();
        let err = dependency_tree(&bd, "bd-999").await.unwrap_err();
        assert!(matches!(err, DtreeError::Process(_)));
    }

    // -- draw_tree ----------------------------------------------------------

    #[tokio::test]
    async fn leaf_renders_single_line() {
        let (bd, fake) = beads();
        let id = fake.add("Only", TaskType::Task, TaskStatus::Blocked);
        assert_eq!(draw_tree(&bd, &id).await.unwrap(), draw("⛔ Only"));
    }

    #[tokio::test]
    async fn three_levels_indent_by_two() {
        let (bd, fake) = beads();
        let epic = fake.add("Epic", TaskType::Epic, TaskStatus::Open);
        let task = fake.add("Task", TaskType::Task, TaskStatus::InProgress);
        let sub = fake.add("Subtask", TaskType::Task, TaskStatus::Closed);
        fake.link(&task, &epic);
        fake.link(&sub, &task);

        assert_eq!(
            draw_tree(&bd, &epic).await.unwrap(),
            draw("○ Epic\n⎿ ⚙ Task\n  ⎿ ✓ Subtask")
        );
    }

    #[tokio::test]
    async fn siblings_keep_tracker_order_depth_first() {
        let (bd, fake) = beads();
        let epic = fake.add("Epic", TaskType::Epic, TaskStatus::Open);
        let first = fake.add("First", TaskType::Task, TaskStatus::Open);
        let second = fake.add("Second", TaskType::Task, TaskStatus::Open);
        let nested = fake.add("Nested", TaskType::Task, TaskStatus::Open);
        fake.link(&first, &epic);
        fake.link(&second, &epic);
        fake.link(&nested, &first);

        assert_eq!(
            draw_tree(&bd, &epic).await.unwrap(),
            draw("○ Epic\n⎿ ○ First\n  ⎿ ○ Nested\n⎿ ○ Second")
        );
    }

    #[tokio::test]
    async fn unmodelled_status_draws_as_open() {
        let source = RawShow(vec![("bd-1", raw_task("bd-1", "Deferred thing", "deferred"))]);
        assert_eq!(
            draw_tree(&source, "bd-1").await.unwrap(),
            draw("○ Deferred thing")
        );
    }

    #[tokio::test]
    async fn unmodelled_child_status_does_not_abort_walk() {
        let epic = raw_task("bd-1", "Epic", "open");
        let child = raw_task("bd-2", "Pinned", "pinned");
        let source = RawShow(vec![
            ("bd-1", with_edges(epic.clone(), vec![], vec![child.clone()])),
            ("bd-2", with_edges(child, vec![epic], vec![])),
        ]);

        assert_eq!(
            draw_tree(&source, "bd-1").await.unwrap(),
            draw("○ Epic\n⎿ ○ Pinned")
        );
        let chain = dependency_tree(&source, "bd-2").await.unwrap();
        assert_eq!(chain[0].status, TaskStatus::Other);
        assert_eq!(chain.len(), 2);

        let status = epic_status(&source, "bd-1").await.unwrap();
        assert_eq!(status.open_tasks, 1);
        assert_eq!(status.total_tasks, 1);
        assert_eq!(status.completion_percentage, 0);
    }

    #[tokio::test]
    async fn draw_cycle_is_detected() {
        let (bd, fake) = beads();
        let a = fake.add("A", TaskType::Task, TaskStatus::Open);
        let b = fake.add("B", TaskType::Task, TaskStatus::Open);
        fake.link(&b, &a);
        fake.link(&a, &b);

        let err = draw_tree(&bd, &a).await.unwrap_err();
        assert!(matches!(err, DtreeError::CycleDetected(_)), "{err:?}");
    }

    #[tokio::test]
    async fn shared_child_is_drawn_under_each_parent() {
        let (bd, fake) = beads();
        let root = fake.add("Root", TaskType::Epic, TaskStatus::Open);
        let left = fake.add("Left", TaskType::Task, TaskStatus::Open);
        let right = fake.add("Right", TaskType::Task, TaskStatus::Open);
        let shared = fake.add("Shared", TaskType::Task, TaskStatus::Open);
        fake.link(&left, &root);
        fake.link(&right, &root);
        fake.link(&shared, &left);
        fake.link(&shared, &right);

        let tree = draw_tree(&bd, &root).await.unwrap();
        assert_eq!(tree.matches("Shared").count(), 2, "{tree}");
    }

    // -- epic_status --------------------------------------------------------

    #[tokio::test]
    async fn empty_epic_is_zero_percent() {
        let (bd, fake) = beads();
        let epic = fake.add("Epic", TaskType::Epic, TaskStatus::Open);

        let status = epic_status(&bd, &epic).await.unwrap();
        assert_eq!(status.total_tasks, 0);
        assert_eq!(status.completion_percentage, 0);
    }

    #[tokio::test]
    async fn counts_direct_children_only() {
        let (bd, fake) = beads();
        let epic = fake.add("Epic", TaskType::Epic, TaskStatus::Open);
        for status in [
            TaskStatus::Closed,
            TaskStatus::InProgress,
            TaskStatus::Open,
            TaskStatus::Open,
        ] {
            let child = fake.add("child", TaskType::Task, status);
            fake.link(&child, &epic);
        }
        let first_child = "bd-2".to_string();
        let grandchild = fake.add("grandchild", TaskType::Task, TaskStatus::Closed);
        fake.link(&grandchild, &first_child);

        let status = epic_status(&bd, &epic).await.unwrap();
        assert_eq!(
            status,
            EpicStatus {
                epic_id: epic.clone(),
                total_tasks: 4,
                completed_tasks: 1,
                in_progress_tasks: 1,
                blocked_tasks: 0,
                open_tasks: 2,
                completion_percentage: 25,
            }
        );
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 4), 25);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(0, 0), 0);
    }
}
