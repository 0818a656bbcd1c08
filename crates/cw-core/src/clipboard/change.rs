use super::hash::ContentHash;
use super::snapshot::ClipboardSnapshot;

/// A genuine clipboard change: the new snapshot plus the fingerprint of the
/// previously emitted one (`None` for the first emission after startup).
#[derive(Debug, Clone)]
pub struct ClipboardChange {
    pub snapshot: ClipboardSnapshot,
    pub previous: Option<ContentHash>,
}
