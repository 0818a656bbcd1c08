//! Format negotiation and extraction.
//!
//! One notification may expose several native representations of the same
//! content at once. Probing walks the priority order and picks the first
//! format that is actually present; the raw bytes are copied out inside
//! the clipboard critical section and decoded only after the clipboard has
//! been released.
//!
//! ## Priority
//!
//! FileDrop → UnicodeText → AnsiText → Dib → BitmapHandle. A file list is
//! the richest representation of a file selection, unicode text beats the
//! single-byte fallback, and a DIB carries more than a bare bitmap handle.
//!
//! ## Absent vs corrupt
//!
//! A missing handle or zero-length buffer means "format absent" and the
//! probe moves on. A buffer that is present but fails to decode aborts the
//! whole attempt: falling back to a lower-priority format at that point
//! would silently capture a degraded duplicate.

pub mod decode;

use thiserror::Error;

use cw_core::{ClipboardSnapshot, MonitorConfig};

/// Native clipboard representations this engine understands, richest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipFormat {
    /// CF_HDROP: a shell file selection.
    FileDrop,
    /// CF_UNICODETEXT: UTF-16LE text.
    UnicodeText,
    /// CF_TEXT: legacy single-byte text.
    AnsiText,
    /// CF_DIB: device-independent bitmap bytes.
    Dib,
    /// CF_BITMAP: a GDI bitmap handle, normalized to DIB bytes by the
    /// platform session before it reaches the decoder.
    BitmapHandle,
}

/// All formats in probe priority order.
pub const PROBE_ORDER: [ClipFormat; 5] = [
    ClipFormat::FileDrop,
    ClipFormat::UnicodeText,
    ClipFormat::AnsiText,
    ClipFormat::Dib,
    ClipFormat::BitmapHandle,
];

impl ClipFormat {
    /// Whether this format may be probed at all under the given config.
    fn enabled(&self, config: &MonitorConfig) -> bool {
        match self {
            ClipFormat::FileDrop => config.save_files,
            ClipFormat::Dib | ClipFormat::BitmapHandle => config.save_images,
            ClipFormat::UnicodeText | ClipFormat::AnsiText => true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Another process holds the clipboard. Expected transient contention,
    /// not an error condition: skip this notification and wait for the next.
    #[error("clipboard is held by another process")]
    Contention,

    /// A buffer was present but malformed; the attempt is aborted.
    #[error("failed to decode {format:?} buffer")]
    Decode {
        format: ClipFormat,
        #[source]
        source: DecodeError,
    },

    /// Unexpected OS-level failure while reading a format.
    #[error("clipboard read failed: {0}")]
    Os(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("buffer too small ({0} bytes)")]
    Truncated(usize),

    #[error("invalid UTF-16 text")]
    InvalidUtf16,

    #[error("malformed file drop block: {0}")]
    MalformedDropList(&'static str),

    #[error("bitmap decode failed: {0}")]
    Bitmap(String),
}

/// One opened clipboard session. On Windows this wraps the open-to-close
/// critical section; tests supply scripted fakes.
pub trait FormatSession {
    fn is_available(&self, format: ClipFormat) -> bool;

    /// Copy out the buffer for `format`. `Ok(None)` means the format is
    /// absent (no handle, or the OS reports a zero-length buffer).
    fn read(&self, format: ClipFormat) -> Result<Option<Vec<u8>>, ExtractError>;
}

/// Raw bytes copied out of the clipboard for exactly one format.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub format: ClipFormat,
    pub bytes: Vec<u8>,
}

/// Probe the session in priority order and copy out the first present
/// format. Returns `Ok(None)` when nothing this engine supports is on the
/// clipboard.
pub fn probe_formats(
    session: &dyn FormatSession,
    config: &MonitorConfig,
) -> Result<Option<RawCapture>, ExtractError> {
    for format in PROBE_ORDER {
        if !format.enabled(config) || !session.is_available(format) {
            continue;
        }
        match session.read(format)? {
            Some(bytes) if !bytes.is_empty() => return Ok(Some(RawCapture { format, bytes })),
            // Zero-length buffer: format absent, keep probing.
            _ => continue,
        }
    }
    Ok(None)
}

/// Decode a raw capture into a typed snapshot. Runs strictly after the
/// clipboard has been released. `Ok(None)` means the buffer decoded to
/// empty content (empty string, empty file list).
pub fn decode_capture(
    raw: &RawCapture,
    config: &MonitorConfig,
) -> Result<Option<ClipboardSnapshot>, ExtractError> {
    let map_err = |source: DecodeError| ExtractError::Decode {
        format: raw.format,
        source,
    };

    let snapshot = match raw.format {
        ClipFormat::UnicodeText => {
            let text = decode::decode_unicode_text(&raw.bytes).map_err(map_err)?;
            if text.is_empty() {
                return Ok(None);
            }
            ClipboardSnapshot::text(text, config.max_text_length)
        }
        ClipFormat::AnsiText => {
            let text = decode::decode_ansi_text(&raw.bytes);
            if text.is_empty() {
                return Ok(None);
            }
            ClipboardSnapshot::text(text, config.max_text_length)
        }
        ClipFormat::FileDrop => {
            let paths = decode::parse_drop_list(&raw.bytes).map_err(map_err)?;
            if paths.is_empty() {
                return Ok(None);
            }
            ClipboardSnapshot::file_list(paths)
        }
        ClipFormat::Dib | ClipFormat::BitmapHandle => {
            let decoded = decode::decode_dib(&raw.bytes).map_err(map_err)?;
            ClipboardSnapshot::image(
                decoded.png,
                decoded.width,
                decoded.height,
                raw.bytes.len() as u64,
            )
        }
    };

    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_core::ClipboardKind;
    use std::collections::HashMap;

    /// Scripted session: a map from format to buffer. A present key with
    /// an empty buffer simulates the zero-length case.
    #[derive(Default)]
    struct FakeSession {
        buffers: HashMap<&'static str, Vec<u8>>,
    }

    fn key(format: ClipFormat) -> &'static str {
        match format {
            ClipFormat::FileDrop => "hdrop",
            ClipFormat::UnicodeText => "unicode",
            ClipFormat::AnsiText => "ansi",
            ClipFormat::Dib => "dib",
            ClipFormat::BitmapHandle => "bitmap",
        }
    }

    impl FakeSession {
        fn with(mut self, format: ClipFormat, bytes: Vec<u8>) -> Self {
            self.buffers.insert(key(format), bytes);
            self
        }
    }

    impl FormatSession for FakeSession {
        fn is_available(&self, format: ClipFormat) -> bool {
            self.buffers.contains_key(key(format))
        }

        fn read(&self, format: ClipFormat) -> Result<Option<Vec<u8>>, ExtractError> {
            Ok(self.buffers.get(key(format)).cloned().filter(|b| !b.is_empty()))
        }
    }

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(|u| u.to_le_bytes())
            .collect()
    }

    fn drop_list(paths: &[&str]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&20u32.to_le_bytes()); // pFiles
        bytes.extend_from_slice(&[0u8; 12]); // pt + fNC
        bytes.extend_from_slice(&1u32.to_le_bytes()); // fWide
        for path in paths {
            bytes.extend(path.encode_utf16().flat_map(|u| u.to_le_bytes()));
            bytes.extend_from_slice(&[0, 0]);
        }
        bytes.extend_from_slice(&[0, 0]);
        bytes
    }

    #[test]
    fn file_list_wins_over_text() {
        let session = FakeSession::default()
            .with(ClipFormat::UnicodeText, utf16("C:\\a.txt"))
            .with(ClipFormat::FileDrop, drop_list(&["C:\\a.txt"]));
        let raw = probe_formats(&session, &MonitorConfig::default())
            .unwrap()
            .expect("something must match");
        assert_eq!(raw.format, ClipFormat::FileDrop);

        let snapshot = decode_capture(&raw, &MonitorConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.kind(), ClipboardKind::FileList);
    }

    #[test]
    fn unicode_text_wins_over_ansi() {
        let session = FakeSession::default()
            .with(ClipFormat::AnsiText, b"legacy\0".to_vec())
            .with(ClipFormat::UnicodeText, utf16("modern"));
        let raw = probe_formats(&session, &MonitorConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(raw.format, ClipFormat::UnicodeText);
    }

    #[test]
    fn zero_length_buffer_is_absent_and_probing_continues() {
        let session = FakeSession::default()
            .with(ClipFormat::UnicodeText, Vec::new())
            .with(ClipFormat::AnsiText, b"fallback\0".to_vec());
        let raw = probe_formats(&session, &MonitorConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(raw.format, ClipFormat::AnsiText);
    }

    #[test]
    fn nothing_supported_yields_none() {
        let session = FakeSession::default();
        assert!(probe_formats(&session, &MonitorConfig::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn disabled_file_capture_skips_hdrop() {
        let config = MonitorConfig {
            save_files: false,
            ..Default::default()
        };
        let session = FakeSession::default()
            .with(ClipFormat::FileDrop, drop_list(&["C:\\a.txt"]))
            .with(ClipFormat::UnicodeText, utf16("text instead"));
        let raw = probe_formats(&session, &config).unwrap().unwrap();
        assert_eq!(raw.format, ClipFormat::UnicodeText);
    }

    #[test]
    fn disabled_image_capture_skips_bitmap_formats() {
        let config = MonitorConfig {
            save_images: false,
            ..Default::default()
        };
        let session = FakeSession::default().with(ClipFormat::Dib, vec![1, 2, 3]);
        assert!(probe_formats(&session, &config).unwrap().is_none());
    }

    #[test]
    fn corrupt_present_buffer_aborts_the_attempt() {
        // Unpaired surrogate: present but undecodable unicode text.
        let mut bad = 0xD800u16.to_le_bytes().to_vec();
        bad.extend_from_slice(&[0, 0]);
        let session = FakeSession::default()
            .with(ClipFormat::UnicodeText, bad)
            .with(ClipFormat::AnsiText, b"would be a degraded duplicate\0".to_vec());

        let raw = probe_formats(&session, &MonitorConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(raw.format, ClipFormat::UnicodeText);

        let result = decode_capture(&raw, &MonitorConfig::default());
        assert!(matches!(
            result,
            Err(ExtractError::Decode {
                format: ClipFormat::UnicodeText,
                ..
            })
        ));
    }

    #[test]
    fn text_decoding_to_empty_yields_none() {
        let raw = RawCapture {
            format: ClipFormat::UnicodeText,
            bytes: vec![0, 0],
        };
        assert!(decode_capture(&raw, &MonitorConfig::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn long_text_is_truncated_per_config() {
        let config = MonitorConfig {
            max_text_length: 4,
            ..Default::default()
        };
        let raw = RawCapture {
            format: ClipFormat::UnicodeText,
            bytes: utf16("abcdefgh"),
        };
        let snapshot = decode_capture(&raw, &config).unwrap().unwrap();
        assert!(snapshot.truncated);
        assert_eq!(snapshot.original_size, 8);
    }
}
