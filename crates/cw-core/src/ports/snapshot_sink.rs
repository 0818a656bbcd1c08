use anyhow::Result;
use std::path::PathBuf;

use crate::clipboard::ClipboardChange;

/// Persistence sink for emitted clipboard changes.
///
/// Implementations write one content file and one metadata file per
/// snapshot. Failures are reported to the caller, which logs them; they
/// never propagate back into the listener.
pub trait SnapshotSink: Send + Sync {
    /// Persist one change; returns the path of the written content file.
    fn persist(&self, change: &ClipboardChange) -> Result<PathBuf>;
}
