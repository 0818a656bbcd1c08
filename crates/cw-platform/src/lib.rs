//! # cw-platform
//!
//! Platform adapters for clipwatch.
//!
//! The format-negotiation and decoding layer is platform-neutral and works
//! on copied-out byte buffers, so it is fully testable off-Windows. The
//! `windows` module supplies the real change listener (hidden message-only
//! window, clipboard-format-listener registration with viewer-chain
//! fallback) and the Win32 clipboard session behind the same traits.

pub mod engine;
pub mod extract;

#[cfg(windows)]
pub mod windows;

pub use engine::{CaptureEngine, ChangeReceiver, ChangeSender, ClipboardAccess};
pub use extract::{ClipFormat, DecodeError, ExtractError, FormatSession, RawCapture};

#[cfg(windows)]
pub use windows::listener::{ClipboardListener, ListenerError};
