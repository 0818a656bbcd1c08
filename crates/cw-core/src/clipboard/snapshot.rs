use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::fingerprint::fingerprint;
use super::hash::ContentHash;

/// Marker appended to text payloads that were cut at the configured maximum.
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardKind {
    Text,
    Image,
    FileList,
    Unknown,
}

impl ClipboardKind {
    /// Natural unit of `original_size` for this kind.
    pub fn size_unit(&self) -> &'static str {
        match self {
            ClipboardKind::Text => "chars",
            ClipboardKind::Image => "bytes",
            ClipboardKind::FileList => "files",
            ClipboardKind::Unknown => "bytes",
        }
    }
}

/// Kind-specific payload of one captured clipboard state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardPayload {
    /// UTF-8 text, possibly truncated to the configured maximum length.
    Text(String),
    /// Image re-encoded to canonical PNG, plus pixel dimensions.
    Image {
        png: Vec<u8>,
        width: u32,
        height: u32,
    },
    /// Absolute file paths in the order the OS reported them.
    FileList(Vec<PathBuf>),
    Unknown,
}

impl ClipboardPayload {
    pub fn kind(&self) -> ClipboardKind {
        match self {
            ClipboardPayload::Text(_) => ClipboardKind::Text,
            ClipboardPayload::Image { .. } => ClipboardKind::Image,
            ClipboardPayload::FileList(_) => ClipboardKind::FileList,
            ClipboardPayload::Unknown => ClipboardKind::Unknown,
        }
    }
}

/// One captured, classified unit of clipboard content at a point in time.
///
/// Immutable after construction. The fingerprint is a pure function of the
/// payload, never of `captured_at`, so identical content copied at different
/// times yields identical fingerprints and can be deduplicated.
#[derive(Debug, Clone)]
pub struct ClipboardSnapshot {
    pub captured_at: DateTime<Utc>,
    pub payload: ClipboardPayload,
    /// Size in the kind's natural unit (chars, bytes, file count) before
    /// any truncation.
    pub original_size: u64,
    pub truncated: bool,
    pub fingerprint: ContentHash,
}

impl ClipboardSnapshot {
    /// Build a text snapshot, truncating to `max_chars` with a marker when
    /// the content is longer. `original_size` always reflects the full
    /// pre-truncation character count.
    pub fn text(text: String, max_chars: usize) -> Self {
        let char_count = text.chars().count();
        let truncated = char_count > max_chars;

        let content = if truncated {
            let mut cut: String = text.chars().take(max_chars).collect();
            cut.push_str(TRUNCATION_MARKER);
            cut
        } else {
            text
        };

        Self::from_payload(
            ClipboardPayload::Text(content),
            char_count as u64,
            truncated,
        )
    }

    /// Build an image snapshot from canonically re-encoded PNG bytes.
    /// `original_size` is the byte size of the native clipboard buffer.
    pub fn image(png: Vec<u8>, width: u32, height: u32, original_bytes: u64) -> Self {
        Self::from_payload(
            ClipboardPayload::Image { png, width, height },
            original_bytes,
            false,
        )
    }

    /// Build a file-list snapshot. Paths keep OS report order; the
    /// fingerprint canonicalizes ordering separately.
    pub fn file_list(paths: Vec<PathBuf>) -> Self {
        let count = paths.len() as u64;
        Self::from_payload(ClipboardPayload::FileList(paths), count, false)
    }

    fn from_payload(payload: ClipboardPayload, original_size: u64, truncated: bool) -> Self {
        let fingerprint = fingerprint(&payload);
        Self {
            captured_at: Utc::now(),
            payload,
            original_size,
            truncated,
            fingerprint,
        }
    }

    pub fn kind(&self) -> ClipboardKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_below_limit_is_not_truncated() {
        let snapshot = ClipboardSnapshot::text("hello".to_string(), 10_000);
        assert_eq!(snapshot.kind(), ClipboardKind::Text);
        assert!(!snapshot.truncated);
        assert_eq!(snapshot.original_size, 5);
        assert_eq!(
            snapshot.payload,
            ClipboardPayload::Text("hello".to_string())
        );
    }

    #[test]
    fn text_above_limit_is_truncated_with_marker() {
        let long = "a".repeat(20);
        let snapshot = ClipboardSnapshot::text(long, 10);
        assert!(snapshot.truncated);
        assert_eq!(snapshot.original_size, 20);
        match &snapshot.payload {
            ClipboardPayload::Text(text) => {
                assert!(text.starts_with("aaaaaaaaaa"));
                assert!(text.ends_with(TRUNCATION_MARKER));
                assert_eq!(text.chars().count(), 10 + TRUNCATION_MARKER.chars().count());
            }
            other => panic!("expected text payload, got {other:?}"),
        }
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        // Multi-byte characters must not be split mid-codepoint.
        let text = "日本語のテキスト".to_string();
        let snapshot = ClipboardSnapshot::text(text, 4);
        assert!(snapshot.truncated);
        assert_eq!(snapshot.original_size, 8);
        match &snapshot.payload {
            ClipboardPayload::Text(content) => {
                assert!(content.starts_with("日本語の"));
            }
            other => panic!("expected text payload, got {other:?}"),
        }
    }

    #[test]
    fn file_list_size_is_file_count() {
        let snapshot = ClipboardSnapshot::file_list(vec![
            PathBuf::from("C:\\a.txt"),
            PathBuf::from("C:\\b.txt"),
        ]);
        assert_eq!(snapshot.kind(), ClipboardKind::FileList);
        assert_eq!(snapshot.original_size, 2);
        assert!(!snapshot.truncated);
    }

    #[test]
    fn image_size_is_native_buffer_bytes() {
        let snapshot = ClipboardSnapshot::image(vec![1, 2, 3], 2, 2, 640);
        assert_eq!(snapshot.kind(), ClipboardKind::Image);
        assert_eq!(snapshot.original_size, 640);
    }

    #[test]
    fn fingerprint_ignores_capture_time() {
        let a = ClipboardSnapshot::text("same".to_string(), 100);
        let b = ClipboardSnapshot::text("same".to_string(), 100);
        assert_eq!(a.fingerprint, b.fingerprint);
    }
}
