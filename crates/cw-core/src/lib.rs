//! # cw-core
//!
//! Core domain models and business logic for clipwatch.
//!
//! This crate contains pure business logic without any platform dependencies:
//! the clipboard snapshot model, the fingerprint engine, change detection,
//! and the configuration model.

// Public module exports
pub mod clipboard;
pub mod config;
pub mod ports;

// Re-export commonly used types at the crate root
pub use clipboard::{
    ChangeDetector, ClipboardChange, ClipboardKind, ClipboardPayload, ClipboardSnapshot,
    ContentHash, HashAlgorithm,
};
pub use config::MonitorConfig;
