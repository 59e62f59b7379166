//! Changeset submission command.

use console::style;
use osmtagger::config::ConfigFile;
use osmtagger::osm::SkipReason;
use osmtagger::sync::{SubmissionPhase, SubmissionReport};

use super::common::start_app;
use crate::error::CliError;

/// Upload everything staged as one changeset.
pub fn run(comment: Option<String>) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let app = start_app(&config)?;
    let handle = app.runtime_handle();

    let mut phases = app.sync().phase();
    let watcher = handle.spawn(async move {
        while phases.changed().await.is_ok() {
            let phase = *phases.borrow_and_update();
            if phase != SubmissionPhase::Idle {
                println!("  {}...", style(phase).dim());
            }
        }
    });

    let result = handle.block_on(app.sync().submit(app.store(), comment.as_deref()));
    watcher.abort();

    print_report(&result?);
    Ok(())
}

fn print_report(report: &SubmissionReport) {
    println!(
        "{} changeset {}: {} created, {} modified, {} deleted",
        style("Uploaded").green().bold(),
        report.changeset_id,
        report.created,
        report.modified,
        report.deleted
    );
    if !report.closed {
        println!(
            "{} the changeset could not be closed; the server closes it within the hour",
            style("note:").yellow()
        );
    }
    for entry in &report.skipped {
        let reason = match entry.reason {
            SkipReason::RelationCreate => "new relations cannot be uploaded",
            SkipReason::MissingPosition => "node has no position",
        };
        println!("{} {} kept: {}", style("skipped:").yellow(), entry.id, reason);
    }
}
