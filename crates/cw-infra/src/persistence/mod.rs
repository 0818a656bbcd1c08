//! Filesystem snapshot store.
//!
//! Each persisted change becomes two files under a per-kind subdirectory
//! of the output root: a content file (`.txt` or `.png`) and a sibling
//! `.json` metadata file sharing the same stem.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use cw_core::clipboard::{ClipboardChange, ClipboardKind, ClipboardPayload};
use cw_core::ports::SnapshotSink;

/// Sidecar metadata written next to every content file.
#[derive(Debug, Serialize)]
struct SnapshotMetadata {
    timestamp: DateTime<Utc>,
    kind: ClipboardKind,
    original_size: u64,
    size_unit: &'static str,
    truncated: bool,
    fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    png_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_count: Option<usize>,
}

impl SnapshotMetadata {
    fn from_change(change: &ClipboardChange) -> Self {
        let snapshot = &change.snapshot;
        let mut meta = Self {
            timestamp: snapshot.captured_at,
            kind: snapshot.kind(),
            original_size: snapshot.original_size,
            size_unit: snapshot.kind().size_unit(),
            truncated: snapshot.truncated,
            fingerprint: snapshot.fingerprint.to_hex(),
            previous_fingerprint: change.previous.as_ref().map(|hash| hash.to_hex()),
            line_count: None,
            word_count: None,
            width: None,
            height: None,
            png_bytes: None,
            file_count: None,
        };

        match &snapshot.payload {
            ClipboardPayload::Text(text) => {
                meta.line_count = Some(text.lines().count());
                meta.word_count = Some(text.split_whitespace().count());
            }
            ClipboardPayload::Image { png, width, height } => {
                meta.width = Some(*width);
                meta.height = Some(*height);
                meta.png_bytes = Some(png.len());
            }
            ClipboardPayload::FileList(paths) => {
                meta.file_count = Some(paths.len());
            }
            ClipboardPayload::Unknown => {}
        }

        meta
    }
}

/// [`SnapshotSink`] that lays snapshots out as plain files, one
/// subdirectory per content kind.
pub struct FsSnapshotStore {
    root: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn kind_dir(&self, kind: ClipboardKind) -> PathBuf {
        let sub = match kind {
            ClipboardKind::Text => "text",
            ClipboardKind::Image => "images",
            ClipboardKind::FileList => "files",
            ClipboardKind::Unknown => "other",
        };
        self.root.join(sub)
    }

    fn file_stem(kind: ClipboardKind, captured_at: DateTime<Utc>) -> String {
        let tag = match kind {
            ClipboardKind::Text => "text",
            ClipboardKind::Image => "image",
            ClipboardKind::FileList => "files",
            ClipboardKind::Unknown => "other",
        };
        format!("clipboard_{}_{}", tag, captured_at.format("%Y%m%d_%H%M%S_%3f"))
    }

    fn write_metadata(path: &Path, change: &ClipboardChange) -> Result<()> {
        let meta = SnapshotMetadata::from_change(change);
        let content = serde_json::to_string_pretty(&meta).context("serialize metadata failed")?;
        fs::write(path, content)
            .with_context(|| format!("write metadata failed: {}", path.display()))
    }
}

impl SnapshotSink for FsSnapshotStore {
    fn persist(&self, change: &ClipboardChange) -> Result<PathBuf> {
        let snapshot = &change.snapshot;
        let dir = self.kind_dir(snapshot.kind());
        fs::create_dir_all(&dir)
            .with_context(|| format!("create output dir failed: {}", dir.display()))?;

        let stem = Self::file_stem(snapshot.kind(), snapshot.captured_at);

        let content_path = match &snapshot.payload {
            ClipboardPayload::Text(text) => {
                let path = dir.join(format!("{stem}.txt"));
                fs::write(&path, text)
                    .with_context(|| format!("write text failed: {}", path.display()))?;
                path
            }
            ClipboardPayload::Image { png, .. } => {
                let path = dir.join(format!("{stem}.png"));
                fs::write(&path, png)
                    .with_context(|| format!("write image failed: {}", path.display()))?;
                path
            }
            ClipboardPayload::FileList(paths) => {
                let path = dir.join(format!("{stem}.txt"));
                let mut listing = paths
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("\n");
                listing.push('\n');
                fs::write(&path, listing)
                    .with_context(|| format!("write file list failed: {}", path.display()))?;
                path
            }
            ClipboardPayload::Unknown => {
                anyhow::bail!("unknown payload kind cannot be persisted")
            }
        };

        Self::write_metadata(&content_path.with_extension("json"), change)?;
        Ok(content_path)
    }
}
