use crate::cmd::{load_config, open_jj, runtime, unbound_jj};
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use dtree_core::workflow::{create_jj_bookmark, CreateJjBookmark};
use std::path::Path;

#[derive(Subcommand)]
pub enum JjSubcommand {
    /// Show the current change, its description and modified files
    Status,

    /// Begin a task: describe a change for it and leave an empty working copy on top
    Start {
        /// Task description
        description: String,
    },

    /// Append a bullet to the task description and squash the working copy into it
    Checkpoint {
        /// One-line summary of the work since the last checkpoint
        summary: String,
    },

    /// Close out the task and leave a fresh working copy
    Finish,

    /// Set the description of the current change
    Describe {
        /// New description
        description: String,
    },

    /// Recent changes, most recent first
    Log {
        /// Maximum number of entries (default: log_limit from config)
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Id, description and diff of a revision
    Show {
        /// Revision (default: @)
        revision: Option<String>,
    },

    /// Create a bookmark at the current change
    Bookmark {
        /// Bookmark name, e.g. feature/sc-12345
        name: String,
        /// Also describe the current change
        #[arg(long)]
        description: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: JjSubcommand, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let rt = runtime()?;

    rt.block_on(async {
        if let JjSubcommand::Bookmark { name, description } = &subcmd {
            let mut workflow = unbound_jj(&config);
            create_jj_bookmark(
                &mut workflow,
                &CreateJjBookmark {
                    branch_name: name.clone(),
                    repository_path: root.to_path_buf(),
                    description: description.clone(),
                },
            )
            .await
            .with_context(|| format!("failed to create bookmark '{name}'"))?;
            if json {
                print_json(&serde_json::json!({ "bookmark": name }))?;
            } else {
                println!("Created bookmark '{name}'");
            }
            return Ok(());
        }

        let workflow = open_jj(root, &config).await?;
        match subcmd {
            JjSubcommand::Status => {
                let context = workflow.context().await?;
                let files = workflow.changed_files().await?;
                if json {
                    print_json(&serde_json::json!({
                        "current_change_id": context.current_change_id,
                        "description": context.description,
                        "changed_files": files,
                    }))?;
                } else {
                    println!("Change:      {}", context.current_change_id);
                    println!("Description: {}", or_none(&context.description));
                    if files.is_empty() {
                        println!("Files:       (clean)");
                    } else {
                        println!("Files:");
                        for f in &files {
                            println!("  {f}");
                        }
                    }
                }
            }
            JjSubcommand::Start { description } => {
                let started = workflow
                    .start_task(&description)
                    .await
                    .context("failed to start task")?;
                if json {
                    print_json(&started)?;
                } else {
                    println!("Started task; working copy is {}", started.change_id);
                }
            }
            JjSubcommand::Checkpoint { summary } => {
                workflow
                    .checkpoint(&summary)
                    .await
                    .context("failed to checkpoint")?;
                if json {
                    print_json(&serde_json::json!({ "checkpoint": summary }))?;
                } else {
                    println!("Checkpoint: - {summary}");
                }
            }
            JjSubcommand::Finish => {
                workflow.finish_task().await.context("failed to finish task")?;
                let context = workflow.context().await?;
                if json {
                    print_json(&context)?;
                } else {
                    println!("Task finished; working copy is {}", context.current_change_id);
                }
            }
            JjSubcommand::Describe { description } => {
                workflow.describe(&description).await?;
                if json {
                    print_json(&workflow.context().await?)?;
                } else {
                    println!("Described current change");
                }
            }
            JjSubcommand::Log { limit } => {
                let entries = workflow.log(Some(limit.unwrap_or(config.log_limit))).await?;
                if json {
                    print_json(&entries)?;
                } else {
                    let rows = entries
                        .iter()
                        .map(|e| {
                            let first_line = e.description.lines().next().unwrap_or_default();
                            vec![e.change_id.clone(), or_none(first_line).to_string()]
                        })
                        .collect();
                    print_table(&["CHANGE", "DESCRIPTION"], rows);
                }
            }
            JjSubcommand::Show { revision } => {
                let shown = workflow.show(revision.as_deref()).await?;
                if json {
                    print_json(&shown)?;
                } else {
                    println!("Change:      {}", shown.change_id);
                    println!("Description: {}", or_none(&shown.description));
                    if !shown.diff.trim().is_empty() {
                        println!();
                        print!("{}", shown.diff);
                    }
                }
            }
            JjSubcommand::Bookmark { .. } => unreachable!("handled above"),
        }
        Ok(())
    })
}

fn or_none(text: &str) -> &str {
    if text.is_empty() {
        "(no description)"
    } else {
        text
    }
}
