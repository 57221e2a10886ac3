//! Push unsynced pastes to the API.

use anyhow::{Context, Result};

use super::App;

/// Run the sync command.
pub async fn run(app: &App) -> Result<()> {
    let report = app
        .repo
        .sync_unsynced()
        .await
        .into_result()
        .context("Sync failed")?;

    if report.synced + report.deferred + report.rejected == 0 {
        println!("Nothing to sync.");
        return Ok(());
    }

    println!("Sync finished:");
    println!("  Synced:   {}", report.synced);
    println!("  Deferred: {}", report.deferred);
    println!("  Rejected: {}", report.rejected);

    if report.deferred > 0 {
        println!();
        println!("Deferred pastes will be retried on the next 'pastebin sync'.");
    }

    Ok(())
}
