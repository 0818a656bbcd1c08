//! Capture engine: ties one clipboard notification to at most one emitted
//! change event.
//!
//! The engine runs entirely on the listener thread. Per notification it
//! opens the clipboard, probes formats, copies the winning buffer out,
//! releases the clipboard, then decodes, fingerprints, and deduplicates.
//! Persistence is dispatched over the change channel, never performed
//! inline, so the message loop is back to pumping within milliseconds.

use tokio::sync::mpsc;

use cw_core::{ChangeDetector, ClipboardChange, MonitorConfig};

use crate::extract::{decode_capture, probe_formats, ExtractError, FormatSession, RawCapture};

pub type ChangeSender = mpsc::UnboundedSender<ClipboardChange>;
pub type ChangeReceiver = mpsc::UnboundedReceiver<ClipboardChange>;

/// Source of clipboard sessions. The Windows implementation opens the real
/// clipboard (failure = another process holds it); tests script sequences
/// of fake sessions.
pub trait ClipboardAccess {
    fn open(&mut self) -> Result<Box<dyn FormatSession + '_>, ExtractError>;
}

pub struct CaptureEngine<A: ClipboardAccess> {
    access: A,
    config: MonitorConfig,
    detector: ChangeDetector,
    tx: ChangeSender,
}

impl<A: ClipboardAccess> CaptureEngine<A> {
    pub fn new(access: A, config: MonitorConfig, tx: ChangeSender) -> Self {
        Self {
            access,
            config,
            detector: ChangeDetector::new(),
            tx,
        }
    }

    /// Handle one "clipboard changed" notification. All per-notification
    /// failures are contained here: contention and absent formats are
    /// non-events, decode failures drop the attempt with a warning, and
    /// the dedup baseline is only advanced on genuine emission.
    pub fn handle_notification(&mut self) {
        let raw = match self.copy_out() {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(ExtractError::Contention) => {
                log::info!("clipboard held by another process, skipping notification");
                return;
            }
            Err(err) => {
                log::warn!("clipboard read failed, skipping notification: {err}");
                return;
            }
        };

        // Clipboard is released by now; decoding and hashing run outside
        // the critical section.
        match decode_capture(&raw, &self.config) {
            Ok(Some(snapshot)) => {
                let kind = snapshot.kind();
                let size = snapshot.original_size;
                if let Some(change) = self.detector.observe(snapshot) {
                    log::info!("captured {:?} ({} {})", kind, size, kind.size_unit());
                    if self.tx.send(change).is_err() {
                        log::warn!("change receiver dropped, event discarded");
                    }
                }
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!("decode failed, notification dropped: {err}");
            }
        }
    }

    /// Open → probe → copy → close. The session guard is dropped before
    /// this function returns, bounding the clipboard critical section.
    fn copy_out(&mut self) -> Result<Option<RawCapture>, ExtractError> {
        let session = self.access.open()?;
        probe_formats(session.as_ref(), &self.config)
    }
}
