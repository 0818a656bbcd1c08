//! File-backed configuration storage.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use cw_core::MonitorConfig;

/// Loads and persists [`MonitorConfig`] as pretty-printed JSON.
///
/// A missing file is not an error: the default configuration is written
/// out so the user has something to edit, then returned.
pub struct ConfigStore {
    path: PathBuf,
}

/// Result of [`ConfigStore::load_or_create`]. Loading runs before the
/// logging subscriber is installed, so the store reports what happened
/// instead of logging it; the caller announces `created` and runs
/// [`MonitorConfig::validate`] once logging is up.
pub struct LoadedConfig {
    pub config: MonitorConfig,
    /// Whether the file was absent and the defaults were written out.
    pub created: bool,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, creating the file with defaults when absent.
    pub fn load_or_create(&self) -> Result<LoadedConfig> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let config = MonitorConfig::default();
                self.save(&config)?;
                return Ok(LoadedConfig {
                    config,
                    created: true,
                });
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read config failed: {}", self.path.display()))
            }
        };

        let config: MonitorConfig = serde_json::from_str(&content)
            .with_context(|| format!("parse config failed: {}", self.path.display()))?;
        Ok(LoadedConfig {
            config,
            created: false,
        })
    }

    /// Atomic write: temp file next to the target, then rename.
    pub fn save(&self, config: &MonitorConfig) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("create config dir failed: {}", dir.display()))?;
            }
        }

        let content = serde_json::to_string_pretty(config).context("serialize config failed")?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("write temp config failed: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "rename temp config to target failed: {} -> {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_creates_defaults_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::new(&path);

        let loaded = store.load_or_create().unwrap();
        assert!(loaded.created);
        assert_eq!(loaded.config.max_text_length, 10_000);
        assert!(path.exists(), "default config must be written out");

        // Round trip through the file just written.
        let reloaded = store.load_or_create().unwrap();
        assert!(!reloaded.created);
        assert_eq!(reloaded.config.max_text_length, loaded.config.max_text_length);
        assert_eq!(reloaded.config.output_directory, loaded.config.output_directory);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "save_images": false }"#).unwrap();

        let loaded = ConfigStore::new(&path).load_or_create().unwrap();
        assert!(!loaded.created);
        assert!(!loaded.config.save_images);
        assert!(loaded.config.save_files);
        assert_eq!(loaded.config.max_text_length, 10_000);
    }

    #[test]
    fn loading_reports_values_as_written_for_later_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "max_text_length": 0, "output_directory": "" }"#).unwrap();

        // The store does not clamp; the caller validates once logging is
        // installed so the warnings are not lost.
        let mut config = ConfigStore::new(&path).load_or_create().unwrap().config;
        assert_eq!(config.max_text_length, 0);
        config.validate();
        assert_eq!(config.max_text_length, 10_000);
        assert_eq!(config.output_directory.to_str().unwrap(), "clipboard_output");
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(ConfigStore::new(&path).load_or_create().is_err());
    }
}
