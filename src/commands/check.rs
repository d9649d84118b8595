use std::path::Path;

use anyhow::Result;
use caltrack_core::config::{API_KEY_ENV, Settings};
use caltrack_core::{Operation, OperationThresholds};
use owo_colors::OwoColorize;

use super::load_settings;

pub fn run(path: &Path) -> Result<()> {
    let settings = load_settings(path)?;

    println!("{} {}", "Settings OK:".green(), path.display());
    print!("{}", describe(&settings));

    if settings.api_key().is_err() {
        println!(
            "\n{}",
            format!("No api_key set. Add one or export {API_KEY_ENV} before syncing.").yellow()
        );
    }

    Ok(())
}

fn describe(settings: &Settings) -> String {
    let mut out = String::new();
    out.push_str(&format!("  Redmine:         {}\n", settings.redmine_url));
    out.push_str(&format!("  Pattern:         {}\n", settings.pattern.as_str()));
    out.push_str(&format!("  Entry uid field: {}\n", settings.entry_uid_field_id));
    out.push_str(&format!("  User feed field: {}\n", settings.user_feed_field_id));
    out.push_str(&thresholds("Events", &settings.thresholds.events));
    out.push_str(&thresholds("Records", &settings.thresholds.records));
    out
}

fn thresholds(label: &str, thresholds: &OperationThresholds) -> String {
    let parts: Vec<String> = [
        ("create", Operation::Create),
        ("update", Operation::Update),
        ("delete", Operation::Delete),
    ]
    .into_iter()
    .map(|(name, op)| format!("{name} {}", thresholds.get(op)))
    .collect();
    format!("  {label} too old to: {}\n", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_lists_thresholds() {
        let settings = Settings::parse(
            r#"
            redmine_url = "https://redmine.example.com"
            pattern = '^#(?P<issue_id>\d+)'
            entry_uid_field_id = 4
            user_feed_field_id = 5

            [thresholds.records]
            delete = "never"
            "#,
        )
        .unwrap();

        let text = describe(&settings);

        assert!(text.contains("https://redmine.example.com"));
        assert!(text.contains("Records too old to: create 30 days, update 30 days, delete never"));
    }

    #[test]
    fn test_check_rejects_bad_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "redmine_url = \"\"").unwrap();

        assert!(run(&path).is_err());
    }
}
