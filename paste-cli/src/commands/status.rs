//! Show session and cache status.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use paste_store::{LocalStore, PASTE_LIST_LIMIT};
use paste_types::{unix_now, Outcome};

use super::App;

/// Run the status command.
pub async fn run(app: &App) -> Result<()> {
    println!("=== pastebin status ===");
    println!();

    let user = app
        .repo
        .session()
        .current_user()
        .await
        .into_result()
        .context("Failed to read session")?;

    match &user {
        Some(user) => {
            println!("Session:");
            println!("  Address: {}", user.name);
        }
        None => {
            println!("Session: NOT LOGGED IN");
            println!();
            println!("Run 'pastebin login --name <address>' to log in.");
        }
    }

    println!();

    let recent = match app.store.pastes().next().await {
        Some(Outcome::Success(pastes)) => pastes,
        Some(Outcome::Failure(failure)) => {
            return Err(failure).context("Failed to read cached pastes");
        }
        None => Vec::new(),
    };
    let unsynced = app
        .store
        .unsynced_pastes()
        .await
        .into_result()
        .context("Failed to read unsynced pastes")?;

    println!("Cache:");
    println!("  Path:      {}", app.database.display());
    println!("  Recent:    {} (max {})", recent.len(), PASTE_LIST_LIMIT);
    println!("  Unsynced:  {}", unsynced.len());
    if let Some(newest) = recent.first() {
        println!("  Last edit: {}", format_timestamp(newest.modified_on));
    }

    println!();
    println!("API:");
    println!("  Base URL: {}", app.config.api.base_url);
    println!("  Timeout:  {}s", app.config.api.timeout_secs);

    if !unsynced.is_empty() && user.is_some() {
        println!();
        println!("Run 'pastebin sync' to push unsynced pastes.");
    }

    Ok(())
}

/// Largest unit first; ages are shown in the largest unit that fits.
const AGE_UNITS: [(&str, i64); 4] = [
    ("week", 604_800),
    ("day", 86_400),
    ("hour", 3_600),
    ("minute", 60),
];

/// Describe how long ago `modified_on` was, relative to now.
pub(crate) fn format_timestamp(modified_on: i64) -> String {
    describe_age(unix_now() - modified_on)
}

fn describe_age(seconds: i64) -> String {
    // Clock skew between this host and the server.
    if seconds < 0 {
        return "in the future".to_string();
    }

    AGE_UNITS
        .iter()
        .find(|(_, size)| seconds >= *size)
        .map(|(unit, size)| match seconds / size {
            1 => format!("1 {} ago", unit),
            n => format!("{} {}s ago", n, unit),
        })
        .unwrap_or_else(|| "just now".to_string())
}
