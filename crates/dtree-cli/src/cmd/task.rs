use crate::cmd::{beads, load_config, runtime};
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use dtree_core::types::{CreateTask, DependencyType, TaskDetail, TaskStatus, TaskType, UpdateTask};
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Create a task
    Create {
        title: String,
        /// task, bug, feature, epic or chore
        #[arg(long = "type", short = 't')]
        task_type: Option<TaskType>,
        /// 0 (highest) to 4 (default: beads.default_priority)
        #[arg(long, short = 'p')]
        priority: Option<u32>,
        #[arg(long, short = 'd')]
        description: Option<String>,
    },

    /// Show a task with its dependencies and dependents
    Show { id: String },

    /// Change fields of a task
    Update {
        id: String,
        /// open, in_progress, blocked or closed
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Replace the notes
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },

    /// Close a task
    Close {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Tasks with no open blockers
    Ready {
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Record that a task depends on another
    Dep {
        /// Dependent task (the child for parent-child)
        id: String,
        /// Task depended on (the parent for parent-child)
        depends_on: String,
        /// parent-child, blocks, related or discovered-from
        #[arg(long = "type", short = 't', default_value = "parent-child")]
        dep_type: DependencyType,
    },

    /// Append a line to a task's notes
    Notes { id: String, text: String },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let bd = beads(root, &config);
    let rt = runtime()?;

    rt.block_on(async {
        match subcmd {
            TaskSubcommand::Create {
                title,
                task_type,
                priority,
                description,
            } => {
                let task = bd
                    .create_task(&CreateTask {
                        title,
                        task_type,
                        priority,
                        description,
                    })
                    .await
                    .context("failed to create task")?;
                if json {
                    print_json(&task)?;
                } else {
                    println!("Created {} [{}] {}", task.id, task.task_type, task.title);
                }
            }
            TaskSubcommand::Show { id } => {
                let detail = bd.show_task(&id).await?;
                if json {
                    print_json(&detail)?;
                } else {
                    print_detail(&detail);
                }
            }
            TaskSubcommand::Update {
                id,
                status,
                notes,
                description,
                title,
            } => {
                let input = UpdateTask {
                    task_id: id.clone(),
                    status,
                    notes,
                    description,
                    title,
                };
                if input.is_empty() {
                    anyhow::bail!("nothing to update: pass --status, --notes, --description or --title");
                }
                bd.update_task(&input)
                    .await
                    .with_context(|| format!("failed to update {id}"))?;
                done(json, "updated", &id)?;
            }
            TaskSubcommand::Close { id, reason } => {
                bd.close_task(&id, reason.as_deref())
                    .await
                    .with_context(|| format!("failed to close {id}"))?;
                done(json, "closed", &id)?;
            }
            TaskSubcommand::Ready { limit } => {
                let tasks = bd.find_ready_tasks(limit).await?;
                if json {
                    print_json(&tasks)?;
                } else if tasks.is_empty() {
                    println!("No ready tasks.");
                } else {
                    let rows = tasks
                        .iter()
                        .map(|t| {
                            vec![
                                t.id.clone(),
                                format!("P{}", t.priority),
                                t.task_type.to_string(),
                                t.title.clone(),
                            ]
                        })
                        .collect();
                    print_table(&["ID", "PRI", "TYPE", "TITLE"], rows);
                }
            }
            TaskSubcommand::Dep {
                id,
                depends_on,
                dep_type,
            } => {
                bd.add_dependency(&id, &depends_on, dep_type)
                    .await
                    .with_context(|| format!("failed to link {id} to {depends_on}"))?;
                if json {
                    print_json(&serde_json::json!({
                        "task_id": id,
                        "depends_on": depends_on,
                        "dependency_type": dep_type,
                    }))?;
                } else {
                    println!("{id} -[{dep_type}]-> {depends_on}");
                }
            }
            TaskSubcommand::Notes { id, text } => {
                bd.append_notes(&id, &text).await?;
                done(json, "noted", &id)?;
            }
        }
        Ok(())
    })
}

fn done(json: bool, action: &str, id: &str) -> anyhow::Result<()> {
    if json {
        print_json(&serde_json::json!({ "task_id": id, "action": action }))
    } else {
        println!("{id} {action}");
        Ok(())
    }
}

fn print_detail(detail: &TaskDetail) {
    let task = &detail.task;
    println!("{} {} {}", task.status.glyph(), task.id, task.title);
    println!(
        "  {} | {} | P{} | updated {}",
        task.task_type,
        task.status,
        task.priority,
        task.updated_at.format("%Y-%m-%d %H:%M")
    );
    if !task.description.is_empty() {
        println!();
        println!("{}", task.description);
    }
    if !task.notes.is_empty() {
        println!();
        println!("Notes:");
        for line in task.notes.lines() {
            println!("  {line}");
        }
    }
    for (label, linked) in [
        ("Depends on", &detail.dependencies),
        ("Dependents", &detail.dependents),
    ] {
        if linked.is_empty() {
            continue;
        }
        println!();
        println!("{label}:");
        for l in linked {
            println!(
                "  {} {} {} ({})",
                l.task.status.glyph(),
                l.task.id,
                l.task.title,
                l.dependency_type
            );
        }
    }
}
