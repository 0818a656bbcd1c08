//! Fingerprint engine: canonical hashing of clipboard payloads.
//!
//! Canonicalization rules, not the digest algorithm, are the compatibility
//! surface here:
//!
//! - Text hashes the raw UTF-8 bytes of the stored payload.
//! - Images are hashed over their canonical PNG re-encoding, so the same
//!   pixels arriving as DIB bytes or a bitmap handle collide.
//! - File lists are sorted lexicographically before joining, so the same
//!   selection hashes identically regardless of OS report order.

use super::hash::ContentHash;
use super::snapshot::ClipboardPayload;

/// Map a payload to its canonical content hash.
pub fn fingerprint(payload: &ClipboardPayload) -> ContentHash {
    match payload {
        ClipboardPayload::Text(text) => ContentHash::digest(text.as_bytes()),
        ClipboardPayload::Image { png, .. } => ContentHash::digest(png),
        ClipboardPayload::FileList(paths) => {
            let mut sorted: Vec<String> = paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            sorted.sort();
            ContentHash::digest(sorted.join("\n").as_bytes())
        }
        ClipboardPayload::Unknown => ContentHash::digest(&[]),
    }
}
