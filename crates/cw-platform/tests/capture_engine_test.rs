//! End-to-end pipeline tests: scripted clipboard sessions run through the
//! capture engine, asserting which notifications turn into change events.

use std::collections::VecDeque;

use cw_core::{ClipboardKind, ClipboardPayload, MonitorConfig};
use cw_platform::engine::{CaptureEngine, ChangeReceiver, ClipboardAccess};
use cw_platform::extract::{ClipFormat, ExtractError, FormatSession};

/// One scripted notification: either a set of present formats or a
/// clipboard held by another process.
enum Step {
    Session(Vec<(ClipFormat, Vec<u8>)>),
    Busy,
}

struct ScriptedClipboard {
    steps: VecDeque<Step>,
}

impl ScriptedClipboard {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
        }
    }
}

struct ScriptedSession {
    buffers: Vec<(ClipFormat, Vec<u8>)>,
}

impl FormatSession for ScriptedSession {
    fn is_available(&self, format: ClipFormat) -> bool {
        self.buffers.iter().any(|(f, _)| *f == format)
    }

    fn read(&self, format: ClipFormat) -> Result<Option<Vec<u8>>, ExtractError> {
        Ok(self
            .buffers
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, bytes)| bytes.clone())
            .filter(|bytes| !bytes.is_empty()))
    }
}

impl ClipboardAccess for ScriptedClipboard {
    fn open(&mut self) -> Result<Box<dyn FormatSession + '_>, ExtractError> {
        match self.steps.pop_front() {
            Some(Step::Session(buffers)) => Ok(Box::new(ScriptedSession { buffers })),
            Some(Step::Busy) | None => Err(ExtractError::Contention),
        }
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
    bytes.extend_from_slice(&20u32.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 12]);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    for path in paths {
        bytes.extend(path.encode_utf16().flat_map(|u| u.to_le_bytes()));
        bytes.extend_from_slice(&[0, 0]);
    }
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

fn text_step(text: &str) -> Step {
    Step::Session(vec![(ClipFormat::UnicodeText, utf16(text))])
}

fn run_script(steps: Vec<Step>) -> ChangeReceiver {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let count = steps.len();
    let mut engine = CaptureEngine::new(ScriptedClipboard::new(steps), MonitorConfig::default(), tx);
    for _ in 0..count {
        engine.handle_notification();
    }
    rx
}

fn payload_text(payload: &ClipboardPayload) -> &str {
    match payload {
        ClipboardPayload::Text(text) => text,
        other => panic!("expected text payload, got {other:?}"),
    }
}

#[test]
fn identical_text_emits_exactly_once() {
    let mut rx = run_script(vec![
        text_step("hello"),
        text_step("hello"),
        text_step("world"),
    ]);

    let first = rx.try_recv().expect("first copy must emit");
    assert_eq!(first.snapshot.kind(), ClipboardKind::Text);
    assert_eq!(payload_text(&first.snapshot.payload), "hello");
    assert!(first.previous.is_none());

    let second = rx.try_recv().expect("changed content must emit");
    assert_eq!(payload_text(&second.snapshot.payload), "world");
    assert_eq!(second.previous, Some(first.snapshot.fingerprint.clone()));
    assert_ne!(first.snapshot.fingerprint, second.snapshot.fingerprint);

    assert!(rx.try_recv().is_err(), "repeat must be suppressed");
}

#[test]
fn contention_does_not_corrupt_dedup_state() {
    let mut rx = run_script(vec![
        text_step("hello"),
        Step::Busy,
        text_step("hello"), // still a repeat of the last emitted snapshot
        text_step("world"),
    ]);

    assert_eq!(payload_text(&rx.try_recv().unwrap().snapshot.payload), "hello");
    assert_eq!(payload_text(&rx.try_recv().unwrap().snapshot.payload), "world");
    assert!(rx.try_recv().is_err());
}

#[test]
fn scrambled_file_sets_dedupe_to_one_event() {
    let mut rx = run_script(vec![
        Step::Session(vec![(
            ClipFormat::FileDrop,
            drop_list(&["C:\\c.txt", "C:\\a.txt", "C:\\b.txt"]),
        )]),
        Step::Session(vec![(
            ClipFormat::FileDrop,
            drop_list(&["C:\\a.txt", "C:\\b.txt", "C:\\c.txt"]),
        )]),
    ]);

    let change = rx.try_recv().expect("first selection must emit");
    assert_eq!(change.snapshot.kind(), ClipboardKind::FileList);
    assert_eq!(change.snapshot.original_size, 3);
    assert!(rx.try_recv().is_err(), "same set in another order must dedupe");
}

#[test]
fn file_list_beats_simultaneous_text() {
    let mut rx = run_script(vec![Step::Session(vec![
        (ClipFormat::UnicodeText, utf16("C:\\a.txt")),
        (ClipFormat::FileDrop, drop_list(&["C:\\a.txt"])),
    ])]);

    let change = rx.try_recv().unwrap();
    assert_eq!(change.snapshot.kind(), ClipboardKind::FileList);
}

#[test]
fn unsupported_content_emits_nothing() {
    let mut rx = run_script(vec![Step::Session(vec![])]);
    assert!(rx.try_recv().is_err());
}

#[test]
fn corrupt_high_priority_buffer_drops_the_notification() {
    // Present-but-malformed unicode text next to a valid ANSI fallback:
    // the attempt is aborted instead of capturing the degraded duplicate.
    let mut bad = 0xD800u16.to_le_bytes().to_vec();
    bad.extend_from_slice(&[0, 0]);

    let mut rx = run_script(vec![Step::Session(vec![
        (ClipFormat::UnicodeText, bad),
        (ClipFormat::AnsiText, b"degraded\0".to_vec()),
    ])]);
    assert!(rx.try_recv().is_err());
}
