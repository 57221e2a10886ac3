//! List pastes.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use paste_types::{Outcome, Paste};
use std::time::Duration;

use super::status::format_timestamp;
use super::App;

/// Extra wait on top of the error display delay before giving up on
/// cached data.
const SETTLE_GRACE: Duration = Duration::from_secs(2);

/// Longest content preview shown per paste.
const PREVIEW_CHARS: usize = 40;

/// Run the list command.
pub async fn run(app: &App, watch: bool) -> Result<()> {
    if watch {
        watch_pastes(app).await
    } else {
        let pastes = fetch_once(app).await?;
        print_pastes(&pastes);
        Ok(())
    }
}

/// Refresh from the API and return the cached list.
///
/// A fetch failure is printed as a warning and the cached list is returned.
pub async fn fetch_once(app: &App) -> Result<Vec<Paste>> {
    let logged_in = app
        .repo
        .session()
        .current_user()
        .await
        .into_result()
        .context("Failed to read session")?
        .is_some();
    if !logged_in {
        anyhow::bail!("Not logged in. Run 'pastebin login --name <address>' first.");
    }

    let mut pastes = app.repo.pastes();
    match pastes.next().await {
        Some(Outcome::Success(list)) => Ok(list),
        Some(Outcome::Failure(failure)) => {
            eprintln!("warning: {}", failure.message());
            let settle = app.repo.config().error_display_delay + SETTLE_GRACE;
            match tokio::time::timeout(settle, pastes.next()).await {
                Ok(Some(Outcome::Success(list))) => Ok(list),
                Ok(Some(Outcome::Failure(next))) => Err(next).context("Failed to list pastes"),
                Ok(None) | Err(_) => Err(failure).context("Failed to list pastes"),
            }
        }
        None => anyhow::bail!("Paste subscription ended unexpectedly"),
    }
}

/// Print every change to the list until interrupted.
async fn watch_pastes(app: &App) -> Result<()> {
    let mut pastes = app.repo.pastes();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = pastes.next() => match next {
                Some(Outcome::Success(list)) => {
                    print_pastes(&list);
                    println!();
                }
                Some(Outcome::Failure(failure)) => eprintln!("warning: {}", failure.message()),
                None => break,
            },
        }
    }
    Ok(())
}

fn print_pastes(pastes: &[Paste]) {
    if pastes.is_empty() {
        println!("No pastes.");
        return;
    }

    for paste in pastes {
        let marker = if paste.is_synced { ' ' } else { '*' };
        println!(
            "{} {:<24} {:>16}  {}",
            marker,
            paste.title,
            format_timestamp(paste.modified_on),
            preview(&paste.content)
        );
    }

    if pastes.iter().any(|p| !p.is_synced) {
        println!();
        println!("* not yet synced, run 'pastebin sync'");
    }
}

/// First line of the content, shortened.
fn preview(content: &str) -> String {
    let line = content.lines().next().unwrap_or("");
    if line.chars().count() > PREVIEW_CHARS || content.lines().nth(1).is_some() {
        let short: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", short)
    } else {
        line.to_string()
    }
}
