//! Create or update a paste.

use anyhow::{Context, Result};
use paste_store::LocalStore;

use super::App;

/// Run the add command.
pub async fn run(app: &App, title: &str, content: &str) -> Result<()> {
    let saved = app
        .repo
        .insert_or_update(title, content)
        .await
        .into_result()
        .context("Failed to save paste")?;

    let pending = app
        .store
        .unsynced_pastes()
        .await
        .into_result()
        .context("Failed to read unsynced pastes")?
        .iter()
        .any(|p| p.title == saved);

    if pending {
        println!("Saved '{}' locally (not yet synced).", saved);
        println!("Run 'pastebin sync' once the API is reachable.");
    } else {
        println!("Saved '{}' ({} bytes).", saved, content.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::offline_app;

    #[tokio::test]
    async fn add_requires_login() {
        let (_dir, app) = offline_app().await;

        assert!(run(&app, "hello", "world").await.is_err());
        assert!(app.store.unsynced_pastes().await.success().unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_rejects_title_with_spaces() {
        let (_dir, app) = offline_app().await;
        app.repo.session().login("alice", "key").await;

        let err = run(&app, "hello world", "x").await.unwrap_err();
        assert!(format!("{:#}", err).contains("Title mustn't contain spaces"));
    }

    #[tokio::test]
    async fn add_offline_keeps_unsynced_copy() {
        let (_dir, app) = offline_app().await;
        app.repo.session().login("alice", "key").await;

        run(&app, "hello", "world").await.unwrap();

        let unsynced = app.store.unsynced_pastes().await.success().unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_eq!(unsynced[0].title, "hello");
        assert_eq!(unsynced[0].content, "world");
    }
}
