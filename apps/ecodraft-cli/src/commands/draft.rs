// draft.rs — Draft subcommands: show, set, validate, resume, discard, complete.
//
// Every invocation is one short session over the stored draft: reconcile at
// startup, apply the requested action, save. This is the same path the
// wizard takes when it is relaunched.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use ecodraft_schema::{list_sections, ValidationResult};
use ecodraft_store::{
    DraftSession, DraftStore, EventDispatcher, FileMedium, LogSink, ProjectConfig, SessionState,
    SnapshotMedium,
};
use serde_json::Value;

#[derive(Subcommand)]
pub enum DraftCommands {
    /// Show the current draft and which sections are filled in.
    Show {
        /// Print the full document as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Set one section and save.
    Set {
        /// Section token (see `ecodraft sections`).
        section: String,
        /// JSON value. Anything that is not valid JSON is stored as a string.
        value: String,
    },
    /// Validate the stored snapshot without changing it.
    Validate,
    /// Resolve a stored draft that cannot be resumed as-is.
    Resume {
        /// Keep every section that is still well-formed.
        #[arg(long, conflicts_with = "discard")]
        salvage: bool,
        /// Throw the stored draft away.
        #[arg(long)]
        discard: bool,
    },
    /// Throw the stored draft away.
    Discard,
    /// Hand over the finished draft and clear the slot.
    Complete {
        /// Write the finished document here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

pub fn execute(cmd: &DraftCommands, project: &ProjectConfig) -> anyhow::Result<()> {
    match cmd {
        DraftCommands::Show { json } => show_draft(project, *json),
        DraftCommands::Set { section, value } => set_section(project, section, value),
        DraftCommands::Validate => validate_snapshot(project),
        DraftCommands::Resume { salvage, discard } => resume_draft(project, *salvage, *discard),
        DraftCommands::Discard => discard_draft(project),
        DraftCommands::Complete { output } => complete_draft(project, output.as_deref()),
    }
}

fn open_session(project: &ProjectConfig) -> anyhow::Result<DraftSession<FileMedium>> {
    let store = DraftStore::open_file(project.snapshot_path());

    let events = match project.events_path() {
        Some(path) => EventDispatcher::new().with_sink(LogSink::new(path)),
        None => EventDispatcher::new(),
    };

    let session = DraftSession::start_with_cache(store, read_cache(project), events)?;
    Ok(session)
}

/// Read the device-local cache copy, if one is configured. An unreadable
/// cache is ignored: the backing store is the source of truth.
fn read_cache(project: &ProjectConfig) -> Option<Value> {
    let path = project.cache_path()?;
    match FileMedium::new(&path).read() {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "ignoring unreadable draft cache"
                );
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring draft cache");
            None
        }
    }
}

/// Mirror the saved document into the cache copy, if one is configured.
fn write_cache(project: &ProjectConfig, session: &DraftSession<FileMedium>) -> anyhow::Result<()> {
    if let Some(path) = project.cache_path() {
        let bytes = serde_json::to_vec_pretty(session.document())?;
        FileMedium::new(path).write(&bytes)?;
    }
    Ok(())
}

fn remove_cache(project: &ProjectConfig) -> anyhow::Result<()> {
    if let Some(path) = project.cache_path() {
        FileMedium::new(path).remove()?;
    }
    Ok(())
}

fn show_draft(project: &ProjectConfig, as_json: bool) -> anyhow::Result<()> {
    let session = open_session(project)?;
    if print_conflict(&session) {
        return Ok(());
    }

    let doc = session.document();
    if as_json {
        println!("{}", serde_json::to_string_pretty(doc)?);
        return Ok(());
    }

    if session.state() == SessionState::NoDraft {
        println!("No draft stored at {}", project.snapshot_path().display());
        return Ok(());
    }

    let progress = doc.progress();
    println!("Draft:    {}", doc.file_name().unwrap_or("(untitled)"));
    println!("State:    {}", session.state());
    println!("Source:   {}", session.source());
    println!("Created:  {}", doc.created_at.to_rfc3339());
    if let Some(saved_at) = doc.saved_at {
        println!("Saved:    {}", saved_at.to_rfc3339());
    }
    println!("Progress: {}/{} sections", progress.filled, progress.total);
    println!();
    for id in list_sections() {
        let mark = if doc.contains(*id) { "x" } else { " " };
        println!("  [{}] {}", mark, id);
    }

    if let Some(result) = session.startup_validation() {
        print_validation(result);
    }
    Ok(())
}

fn set_section(project: &ProjectConfig, section: &str, raw_value: &str) -> anyhow::Result<()> {
    let mut session = open_session(project)?;
    if print_conflict(&session) {
        anyhow::bail!("Resolve the stored draft first (ecodraft draft resume --salvage|--discard)");
    }

    let value = parse_value(raw_value);
    let result = session.commit_by_name(section, value)?;
    let ack = session.save()?;
    write_cache(project, &session)?;

    println!("Saved {} at {}", section, ack.saved_at.to_rfc3339());
    print_validation(&result);
    Ok(())
}

fn validate_snapshot(project: &ProjectConfig) -> anyhow::Result<()> {
    let store = DraftStore::open_file(project.snapshot_path());
    let Some(snapshot) = store.load()? else {
        println!("No draft stored at {}", project.snapshot_path().display());
        return Ok(());
    };

    let result = snapshot.validate();
    println!("Snapshot: {}", project.snapshot_path().display());
    println!("SHA-256:  {}", snapshot.digest());
    print_validation(&result);
    if !result.is_usable() {
        anyhow::bail!("Stored draft is not usable");
    }
    Ok(())
}

fn resume_draft(project: &ProjectConfig, salvage: bool, discard: bool) -> anyhow::Result<()> {
    let mut session = open_session(project)?;
    if session.state() != SessionState::ConflictPending {
        println!("Nothing to resolve: session is {}.", session.state());
        return Ok(());
    }

    if discard {
        session.discard()?;
        remove_cache(project)?;
        println!("Stored draft discarded.");
    } else if salvage {
        let summary = session.salvage()?;
        write_cache(project, &session)?;
        println!(
            "Salvaged {} section(s), dropped {}.",
            summary.recovered.len(),
            summary.discarded.len()
        );
        for key in &summary.discarded {
            println!("  dropped: {}", key);
        }
    } else {
        print_conflict(&session);
        println!("Re-run with --salvage to keep well-formed sections, or --discard.");
    }
    Ok(())
}

fn discard_draft(project: &ProjectConfig) -> anyhow::Result<()> {
    let mut session = open_session(project)?;
    session.discard()?;
    remove_cache(project)?;
    println!("Draft discarded.");
    Ok(())
}

fn complete_draft(project: &ProjectConfig, output: Option<&Path>) -> anyhow::Result<()> {
    let mut session = open_session(project)?;
    if print_conflict(&session) {
        anyhow::bail!("Resolve the stored draft first (ecodraft draft resume --salvage|--discard)");
    }

    let finished = session.complete()?;
    remove_cache(project)?;

    let json = serde_json::to_string_pretty(&finished)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!(
                "Draft '{}' written to {}",
                finished.file_name().unwrap_or_default(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Interpret a command-line value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_conflict(session: &DraftSession<FileMedium>) -> bool {
    let Some(conflict) = session.conflict() else {
        return false;
    };
    println!("Stored draft cannot be resumed ({} copy).", conflict.source);
    println!("  Reason: {}", conflict.reason);
    true
}

fn print_validation(result: &ValidationResult) {
    match result {
        ValidationResult::Valid => println!("Validation: valid"),
        ValidationResult::PartiallyValid(report) => {
            println!("Validation: partially valid");
            for id in &report.missing_mandatory {
                println!("  required, not filled: {}", id);
            }
            for id in &report.malformed {
                println!("  malformed (treated as absent): {} (expected {})", id, id.shape());
            }
            for key in &report.unknown {
                println!("  unknown key (ignored): {}", key);
            }
        }
        ValidationResult::Invalid(reason) => println!("Validation: invalid ({})", reason),
    }
}
