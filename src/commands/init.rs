use std::path::Path;

use anyhow::Result;
use caltrack_core::config::Settings;
use owo_colors::OwoColorize;

pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
    }

    Settings::create_default_config(path).map_err(|e| anyhow::anyhow!(e))?;

    println!("{} {}", "Wrote".green(), path.display());
    println!("\nFill in redmine_url, the custom field ids and your pattern, then run:");
    println!("  caltrack check");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "redmine_url = \"mine\"").unwrap();

        assert!(run(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "redmine_url = \"mine\"");

        run(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("entry_uid_field_id"));
    }
}
