use anyhow::{Context, Result};
use caltrack_core::config::Settings;
use owo_colors::OwoColorize;

use super::redmine_client;

pub async fn run(settings: &Settings) -> Result<()> {
    let client = redmine_client(settings)?;
    let principals = client
        .fetch_principals(settings.user_feed_field_id)
        .await
        .context("Could not list Redmine users")?;

    if principals.is_empty() {
        println!(
            "No users have a calendar feed in custom field {}.",
            settings.user_feed_field_id
        );
        return Ok(());
    }

    for principal in &principals {
        println!(
            "{} {}",
            principal.login.bold(),
            format!("(#{})", principal.id).dimmed()
        );
        println!("   {}", principal.feed_url);
    }

    println!("\n{} users with a calendar feed", principals.len());

    Ok(())
}
