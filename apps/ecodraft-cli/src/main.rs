//! # ecodraft-cli
//!
//! Command-line interface for ecodraft report drafts.
//!
//! - `ecodraft sections` — list the registered draft sections and shapes
//! - `ecodraft draft show/set/validate/resume/discard/complete` — inspect
//!   and edit the stored draft the way the wizard does

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ecodraft_store::DraftConfig;
use tracing_subscriber::EnvFilter;

/// ecodraft — compliance-report drafts from the command line.
#[derive(Parser)]
#[command(name = "ecodraft", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered draft sections.
    Sections {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Inspect and edit the stored draft.
    Draft {
        #[command(subcommand)]
        command: commands::draft::DraftCommands,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ecodraft_store=warn".parse()?)
                .add_directive("ecodraft_schema=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let project = DraftConfig::for_project(&project_root);
    tracing::debug!(state_dir = %project.state_dir.display(), "resolved project config");

    match &cli.command {
        Commands::Sections { json } => commands::sections::execute(*json),
        Commands::Draft { command } => commands::draft::execute(command, &project),
    }
}
