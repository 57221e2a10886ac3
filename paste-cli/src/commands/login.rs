//! Store the session.

use anyhow::{Context, Result};

use super::App;

/// Run the login command.
pub async fn run(app: &App, name: &str, api_key: Option<&str>) -> Result<()> {
    let api_key = match api_key {
        Some(key) => key.to_string(),
        None => rpassword::prompt_password("API key: ").context("Failed to read API key")?,
    };

    app.repo
        .session()
        .login(name, &api_key)
        .await
        .into_result()
        .context("Login failed")?;

    println!("Logged in as {}", name);
    println!();
    println!("  Cache: {}", app.database.display());
    println!("  API:   {}", app.config.api.base_url);
    println!();
    println!("Next steps:");
    println!("  1. List your pastes: pastebin list");
    println!("  2. Add a paste: pastebin add <title> <content>");

    Ok(())
}
