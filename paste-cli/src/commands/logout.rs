//! Remove the session.

use anyhow::{Context, Result};

use super::App;

/// Run the logout command.
pub async fn run(app: &App) -> Result<()> {
    let session = app.repo.session();
    let user = session
        .current_user()
        .await
        .into_result()
        .context("Failed to read session")?;

    let Some(user) = user else {
        println!("Not logged in.");
        return Ok(());
    };

    session.logout().await.into_result().context("Logout failed")?;

    println!("Logged out {}", user.name);
    println!("Cached pastes are kept in {}", app.database.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::offline_app;
    use paste_store::LocalStore;
    use paste_types::{Outcome, Paste};

    #[tokio::test]
    async fn logout_without_session_succeeds() {
        let (_dir, app) = offline_app().await;
        assert!(run(&app).await.is_ok());
    }

    #[tokio::test]
    async fn logout_clears_session_and_keeps_cache() {
        let (_dir, app) = offline_app().await;
        app.repo.session().login("alice", "key").await;
        app.store.insert_or_update_paste(Paste::new("draft", "x")).await;

        run(&app).await.unwrap();

        assert_eq!(app.repo.session().current_user().await, Outcome::Success(None));
        let unsynced = app.store.unsynced_pastes().await.success().unwrap();
        assert_eq!(unsynced.len(), 1);
    }
}
