use crate::cmd::{beads, load_config, open_jj, runtime};
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use dtree_core::workflow::{self, FinishTask};
use std::path::Path;

#[derive(Subcommand)]
pub enum WorkflowSubcommand {
    /// Start a jj task for a bd task and mark it in_progress
    Start {
        task_id: String,
        /// Change description; usually the task title
        description: String,
    },

    /// Checkpoint, close the bd task, note it on the epic and leave a fresh working copy
    Finish {
        task_id: String,
        /// Final checkpoint summary
        summary: String,
        /// Close reason recorded by bd
        #[arg(long)]
        reason: Option<String>,
        /// Epic to append a completion note to
        #[arg(long = "epic")]
        epic_id: Option<String>,
        /// Note text (default: "Completed <task>: <summary>")
        #[arg(long, requires = "epic_id")]
        epic_notes: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: WorkflowSubcommand, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let bd = beads(root, &config);
    let rt = runtime()?;

    rt.block_on(async {
        let jj = open_jj(root, &config).await?;
        match subcmd {
            WorkflowSubcommand::Start {
                task_id,
                description,
            } => {
                let started = workflow::start(&jj, &bd, &task_id, &description)
                    .await
                    .with_context(|| format!("failed to start {task_id}"))?;
                if json {
                    print_json(&serde_json::json!({
                        "task_id": task_id,
                        "change_id": started.change_id,
                        "was_empty": started.was_empty,
                    }))?;
                } else {
                    println!(
                        "{task_id} in progress; working copy is {}",
                        started.change_id
                    );
                }
            }
            WorkflowSubcommand::Finish {
                task_id,
                summary,
                reason,
                epic_id,
                epic_notes,
            } => {
                let input = FinishTask {
                    task_id,
                    summary,
                    reason,
                    epic_id,
                    epic_notes,
                };
                workflow::finish(&jj, &bd, &input)
                    .await
                    .with_context(|| format!("failed to finish {}", input.task_id))?;
                if json {
                    print_json(&serde_json::json!({
                        "task_id": input.task_id,
                        "closed": true,
                        "epic_id": input.epic_id,
                    }))?;
                } else {
                    println!("{} closed", input.task_id);
                    if let Some(epic) = &input.epic_id {
                        println!("Noted on {epic}");
                    }
                }
            }
        }
        Ok(())
    })
}
