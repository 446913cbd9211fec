use crate::cmd::{beads, load_config, runtime};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use dtree_core::tree::{dependency_tree, draw_tree, epic_status};
use std::path::Path;

#[derive(Subcommand)]
pub enum TreeSubcommand {
    /// The task, its parent, grandparent and so on up to the root
    Ancestors { id: String },

    /// Draw the task and every descendant
    Draw { id: String },

    /// Completion counts over an epic's direct children
    Epic { id: String },
}

pub fn run(root: &Path, subcmd: TreeSubcommand, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let bd = beads(root, &config);
    let rt = runtime()?;

    rt.block_on(async {
        match subcmd {
            TreeSubcommand::Ancestors { id } => {
                let chain = dependency_tree(&bd, &id).await?;
                if json {
                    print_json(&chain)?;
                } else {
                    let rows = chain
                        .iter()
                        .enumerate()
                        .map(|(depth, t)| {
                            vec![
                                depth.to_string(),
                                t.id.clone(),
                                format!("{} {}", t.status.glyph(), t.status),
                                t.title.clone(),
                            ]
                        })
                        .collect();
                    print_table(&["UP", "ID", "STATUS", "TITLE"], rows);
                }
            }
            TreeSubcommand::Draw { id } => {
                let drawn = draw_tree(&bd, &id).await?;
                if json {
                    print_json(&serde_json::json!({ "tree": drawn }))?;
                } else {
                    println!("{drawn}");
                }
            }
            TreeSubcommand::Epic { id } => {
                let status = epic_status(&bd, &id).await?;
                if json {
                    print_json(&status)?;
                } else {
                    println!(
                        "{}: {}/{} done ({}%)",
                        status.epic_id,
                        status.completed_tasks,
                        status.total_tasks,
                        status.completion_percentage
                    );
                    println!("  in progress: {}", status.in_progress_tasks);
                    println!("  blocked:     {}", status.blocked_tasks);
                    println!("  open:        {}", status.open_tasks);
                }
            }
        }
        Ok(())
    })
}
