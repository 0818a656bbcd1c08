//! Clipboard domain models.

mod change;
mod dedup;
mod fingerprint;
mod hash;
mod snapshot;

pub use change::ClipboardChange;
pub use dedup::ChangeDetector;
pub use fingerprint::fingerprint;
pub use hash::{ContentHash, HashAlgorithm};
pub use snapshot::{ClipboardKind, ClipboardPayload, ClipboardSnapshot};
