//! Win32 adapters: the real clipboard session and the change listener.

pub mod clipboard;
pub mod listener;

pub use clipboard::Win32Clipboard;
pub use listener::{ClipboardListener, ListenerError};
