pub mod check;
pub mod init;
pub mod sync;
pub mod users;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use caltrack_core::config::Settings;
use caltrack_redmine::RedmineClient;

pub fn settings_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Settings::config_path().map_err(|e| anyhow::anyhow!(e)),
    }
}

pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        anyhow::bail!(
            "No settings file at {}.\n\n\
            Create one with:\n  \
            caltrack init",
            path.display()
        );
    }

    Settings::load(path).map_err(|e| anyhow::anyhow!(e))
}

pub fn redmine_client(settings: &Settings) -> Result<RedmineClient> {
    let api_key = settings.api_key().map_err(|e| anyhow::anyhow!(e))?;
    RedmineClient::new(&settings.redmine_url, api_key, settings.request_timeout())
        .context("Could not set up the Redmine client")
}
