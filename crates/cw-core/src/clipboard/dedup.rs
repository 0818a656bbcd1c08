//! Change detection by fingerprint comparison.
//!
//! The clipboard re-notifies for every ownership change, including repeats
//! of identical content. The detector keeps the fingerprint of the last
//! emitted snapshot and suppresses notifications whose content hashes to
//! the same value. Failed or empty extractions never reach the detector,
//! so they cannot disturb the comparison baseline.

use super::change::ClipboardChange;
use super::hash::ContentHash;
use super::snapshot::ClipboardSnapshot;

/// Single-owner change detector; mutated only from the listener thread.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_fingerprint: Option<ContentHash>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a snapshot: returns the change event if the content differs
    /// from the last emitted snapshot, `None` if it is a repeat.
    pub fn observe(&mut self, snapshot: ClipboardSnapshot) -> Option<ClipboardChange> {
        if self.last_fingerprint.as_ref() == Some(&snapshot.fingerprint) {
            return None;
        }

        let previous = self.last_fingerprint.replace(snapshot.fingerprint.clone());
        Some(ClipboardChange { snapshot, previous })
    }

    pub fn last_fingerprint(&self) -> Option<&ContentHash> {
        self.last_fingerprint.as_ref()
    }
}
