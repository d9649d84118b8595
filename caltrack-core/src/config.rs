//! Settings file for caltrack.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CalTrackError, CalTrackResult};
use crate::mail::MailSettings;
use crate::pattern::SummaryPattern;
use crate::threshold::ThresholdPolicy;

/// Environment variable overriding `api_key`.
pub const API_KEY_ENV: &str = "CALTRACK_API_KEY";

fn default_timeout_secs() -> u64 {
    30
}

fn default_notify() -> bool {
    true
}

fn default_subject() -> String {
    "Your time entries were synchronized".to_string()
}

/// Settings at ~/.config/caltrack/settings.toml
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Base URL of the Redmine instance
    pub redmine_url: String,

    /// Administrator API key, may instead come from `CALTRACK_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Summary pattern with an `issue_id` named group
    pub pattern: SummaryPattern,

    /// Time entry custom field holding the event uid
    pub entry_uid_field_id: u64,

    /// User custom field holding the feed URL
    pub user_feed_field_id: u64,

    #[serde(default)]
    pub thresholds: ThresholdPolicy,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Send a summary to users whose records changed
    #[serde(default = "default_notify")]
    pub notify: bool,

    #[serde(default = "default_subject")]
    pub notify_subject: String,

    /// SMTP delivery of summaries; without it summaries go to the log
    #[serde(default)]
    pub mail: Option<MailSettings>,
}

impl Settings {
    pub fn config_path() -> CalTrackResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalTrackError::Config("Could not determine config directory".into()))?
            .join("caltrack");

        Ok(config_dir.join("settings.toml"))
    }

    /// Load and validate settings. Fails fast on any bad pattern or threshold.
    pub fn load(path: &Path) -> CalTrackResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CalTrackError::Config(format!("Could not read {}: {e}", path.display()))
        })?;

        let mut settings = Self::parse(&contents)
            .map_err(|e| CalTrackError::Config(format!("{}: {e}", path.display())))?;

        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.is_empty()
        {
            settings.api_key = Some(key);
        }

        Ok(settings)
    }

    pub fn parse(contents: &str) -> CalTrackResult<Self> {
        let settings: Settings =
            toml::from_str(contents).map_err(|e| CalTrackError::Config(e.to_string()))?;

        if settings.redmine_url.trim().is_empty() {
            return Err(CalTrackError::Config("redmine_url must not be empty".into()));
        }

        Ok(settings)
    }

    pub fn api_key(&self) -> CalTrackResult<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            CalTrackError::Config(format!("No api_key in settings and {API_KEY_ENV} is not set"))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Create a settings file with every option documented.
    pub fn create_default_config(path: &Path) -> CalTrackResult<()> {
        let contents = "\
# caltrack settings

# Redmine instance and an administrator API key (or set CALTRACK_API_KEY):
redmine_url = \"https://redmine.example.com\"
# api_key = \"...\"

# Events whose summary matches are tracked. The issue_id group is required.
pattern = '^#(?P<issue_id>\\d+)'

# Custom fields: event uid on time entries, feed URL on users.
entry_uid_field_id = 1
user_feed_field_id = 2

# Email summaries over SMTPS. Without this section summaries are only logged.
# [mail]
# from = \"caltrack <robot@example.com>\"
# smtp_host = \"smtp.example.com\"
# smtp_user = \"robot\"
# smtp_password = \"...\"

# Each threshold is \"always\", \"never\", a date (YYYY-MM-DD) or \"N days\".
[thresholds.events]
create = \"30 days\"
update = \"30 days\"
delete = \"30 days\"

[thresholds.records]
create = \"30 days\"
update = \"30 days\"
delete = \"30 days\"
";

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalTrackError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalTrackError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
