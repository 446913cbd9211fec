mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, jj::JjSubcommand, task::TaskSubcommand, tree::TreeSubcommand,
    workflow::WorkflowSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dtree",
    about = "Discovery-tree task workflow over jj, bd, Shortcut and Notion",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .jj/, .beads/ or .git/)
    #[arg(long, global = true, env = "DTREE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start, checkpoint and finish work on the jj change graph
    Jj {
        #[command(subcommand)]
        subcommand: JjSubcommand,
    },

    /// Manage bd tasks
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Walk parent-child links between tasks
    Tree {
        #[command(subcommand)]
        subcommand: TreeSubcommand,
    },

    /// Show a Shortcut story and its branch name
    Story {
        /// Story public id
        id: u64,
        /// Also bookmark the current change with the story's branch name
        #[arg(long)]
        bookmark: bool,
    },

    /// Show the title and text of a Notion page
    Page {
        /// Page id
        id: String,
    },

    /// Combined jj + bd sequences for starting and finishing a task
    Workflow {
        #[command(subcommand)]
        subcommand: WorkflowSubcommand,
    },

    /// Inspect and validate .dtree/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Jj { subcommand } => cmd::jj::run(&root, subcommand, cli.json),
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
        Commands::Tree { subcommand } => cmd::tree::run(&root, subcommand, cli.json),
        Commands::Story { id, bookmark } => cmd::story::run(&root, id, bookmark, cli.json),
        Commands::Page { id } => cmd::page::run(&root, &id, cli.json),
        Commands::Workflow { subcommand } => cmd::workflow::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
