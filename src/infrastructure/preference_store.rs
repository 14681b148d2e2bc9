// File-backed preference store - Credentials and the tracking-enabled flag as TOML
use crate::application::ports::PreferenceStore;
use crate::domain::credentials::Preferences;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }

        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read preferences from {}", self.path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse preferences in {}", self.path.display()))
    }

    fn save(&self, preferences: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let raw = toml::to_string_pretty(preferences).context("Failed to serialize preferences")?;
        // Replace atomically
        let staging = self.path.with_extension("toml.tmp");
        std::fs::write(&staging, raw)
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        std::fs::rename(&staging, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "Preferences saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let store = FilePreferenceStore::new(tmp.path().join("prefs.toml"));
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = FilePreferenceStore::new(tmp.path().join("nested").join("prefs.toml"));
        let preferences = Preferences {
            auth_token: Some("abc123".to_string()),
            api_url: Some("https://collector.example/api".to_string()),
            tracking_enabled: true,
        };

        store.save(&preferences).unwrap();
        assert_eq!(store.load().unwrap(), preferences);
        assert!(!store.path().with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prefs.toml");
        std::fs::write(&path, "tracking_enabled = true\n").unwrap();

        let preferences = FilePreferenceStore::new(path).load().unwrap();
        assert!(preferences.tracking_enabled);
        assert_eq!(preferences.auth_token, None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prefs.toml");
        std::fs::write(&path, "tracking_enabled = [").unwrap();

        assert!(FilePreferenceStore::new(path).load().is_err());
    }
}
