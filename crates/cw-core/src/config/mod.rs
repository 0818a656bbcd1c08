//! Application configuration domain model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MAX_TEXT_LENGTH: usize = 10_000;

/// Monitor configuration.
///
/// Loaded from a JSON file by the infrastructure layer; unknown values are
/// clamped by [`MonitorConfig::validate`] rather than rejected, so a bad
/// config never prevents startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Directory snapshots are persisted under.
    pub output_directory: PathBuf,

    /// Log file path.
    pub log_file: PathBuf,

    /// Maximum captured text length in characters; longer text is
    /// truncated with a marker.
    pub max_text_length: usize,

    /// Whether image formats are probed at all.
    pub save_images: bool,

    /// Whether the file-drop format is probed at all.
    pub save_files: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("clipboard_output"),
            log_file: PathBuf::from("clipwatch.log"),
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            save_images: true,
            save_files: true,
        }
    }
}

impl MonitorConfig {
    /// Clamp nonsensical values back to defaults, logging a warning for
    /// each correction. Never fails.
    pub fn validate(&mut self) {
        if self.output_directory.as_os_str().is_empty() {
            log::warn!("empty output_directory, falling back to default");
            self.output_directory = Self::default().output_directory;
        }
        if self.max_text_length == 0 {
            log::warn!(
                "max_text_length of 0 is not usable, falling back to {}",
                DEFAULT_MAX_TEXT_LENGTH
            );
            self.max_text_length = DEFAULT_MAX_TEXT_LENGTH;
        }
    }
}
