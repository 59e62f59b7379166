//! Staged edit inspection.

use clap::Subcommand;
use console::style;
use osmtagger::config::ConfigFile;
use osmtagger::staging::{EditStagingStore, StagedObject};

use super::common::format_tags;
use crate::error::CliError;

/// Pending subcommands.
#[derive(Debug, Subcommand)]
pub enum PendingCommands {
    /// List staged edits and deletions
    List,

    /// Drop a staged edit or deletion
    Discard {
        /// Feature id (negative for features not yet uploaded)
        #[arg(allow_hyphen_values = true)]
        id: i64,
    },
}

/// Run a pending subcommand.
pub fn run(command: PendingCommands) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let store = EditStagingStore::open(&config.storage.data_dir);

    match command {
        PendingCommands::List => {
            list(&store);
            Ok(())
        }
        PendingCommands::Discard { id } => discard(&store, id),
    }
}

fn list(store: &EditStagingStore) {
    let saves = store.pending_saves();
    let deletes = store.pending_deletes();

    if saves.is_empty() && deletes.is_empty() {
        println!("Nothing staged.");
        return;
    }

    if !saves.is_empty() {
        println!("{} ({})", style("Staged edits").bold(), saves.len());
        for object in &saves {
            println!("  {}", describe(object));
        }
    }
    if !deletes.is_empty() {
        if !saves.is_empty() {
            println!();
        }
        println!("{} ({})", style("Staged deletions").bold(), deletes.len());
        for object in &deletes {
            println!("  {}", describe(object));
        }
    }

    let conflicts = store.conflicts();
    if !conflicts.is_empty() {
        println!();
        println!(
            "{} {:?} are staged for both edit and deletion",
            style("conflict:").red(),
            conflicts
        );
    }
}

fn discard(store: &EditStagingStore, id: i64) -> Result<(), CliError> {
    match store.discard(id) {
        Some(object) => {
            println!("Discarded {}", describe(&object));
            Ok(())
        }
        None => Err(CliError::Input(format!("Nothing staged with id {}", id))),
    }
}

fn describe(object: &StagedObject) -> String {
    let label = if object.is_local() { "new " } else { "" };
    format!(
        "{}{} {}: {}",
        label,
        object.object_type(),
        object.id,
        format_tags(&object.tags)
    )
}
